//! Rental stock reservation and reconciliation engine.
//!
//! The core of a marketplace backend's rental inventory lifecycle: a finite
//! stock pool per rental item that is atomically decremented when an order is
//! admitted, incremented when an order is cancelled or deleted early, and
//! reconciled by a recurring background sweep that completes orders whose
//! rental window has elapsed.
//!
//! # Architecture
//!
//! ```text
//! HTTP request ──▶ Admission ───▶ ┌──────────────────────────────┐
//! HTTP request ──▶ Lifecycle ──▶ │  RentalStore (transactional)  │
//! timer ────────▶ Sweeper ─────▶ │  items / orders / lines       │
//!                                 └──────────────────────────────┘
//! ```
//!
//! All three actors contend over `RentalItem.quantity` and touch it only
//! through atomic relative updates inside the store; order status guards run
//! in the same transaction that moves stock, so every reservation is settled
//! exactly once no matter how cancel and expiry interleave.

pub mod admission;
pub mod api;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod server;
pub mod stores;
pub mod sweeper;
pub mod types;

pub use admission::Admission;
pub use config::{Config, PostgresConfig, ServerConfig, SweeperConfig};
pub use error::{RentalError, Result};
pub use lifecycle::Lifecycle;
pub use server::{build_router, AppState};
pub use stores::{MemoryRentalStore, PostgresRentalStore, RentalStore};
pub use sweeper::{sweep_expired, ExpirySweeper, SweepReport};
