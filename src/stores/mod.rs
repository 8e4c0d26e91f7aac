//! Storage seam for the rental reservation engine.
//!
//! The [`RentalStore`] trait is the transactional unit-of-work boundary: each
//! method that mutates stock is a single all-or-nothing operation, so a fault
//! mid-sequence leaves state as if the call never happened. Stock is only
//! ever touched through atomic relative deltas behind this seam — no caller
//! reads a quantity, computes, and writes it back.
//!
//! Two implementations exist:
//!
//! - [`PostgresRentalStore`]: row locks (`SELECT ... FOR UPDATE`) plus
//!   conditional relative `UPDATE`s inside sqlx transactions.
//! - [`MemoryRentalStore`]: a mutex over in-memory tables with the same
//!   semantics, used by tests and demos.

mod memory;
mod postgres;

pub use memory::MemoryRentalStore;
pub use postgres::PostgresRentalStore;

use crate::error::Result;
use crate::types::{
    ItemId, NewItem, NewOrder, OrderId, OrderStatus, OrderWithLines, RentalItem, RentalOrder,
    UserId,
};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Filter and paging parameters for a user's order listing.
#[derive(Clone, Copy, Debug)]
pub struct OrderFilter {
    /// Restrict to a single status, if set.
    pub status: Option<OrderStatus>,
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub limit: u32,
}

impl Default for OrderFilter {
    fn default() -> Self {
        Self {
            status: None,
            page: 1,
            limit: 10,
        }
    }
}

/// One page of a user's orders plus the unpaged total.
#[derive(Clone, Debug)]
pub struct OrderPage {
    /// Orders on this page, newest first.
    pub orders: Vec<RentalOrder>,
    /// Total matching orders across all pages.
    pub total: u64,
}

/// Outcome of a sweeper completion attempt for one order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Stock was returned and the order transitioned to `Completed`.
    Completed,
    /// The order was already terminal; nothing was credited. Carries the
    /// status that was observed under lock.
    AlreadyTerminal(OrderStatus),
    /// The order vanished (deleted) between selection and completion.
    Gone,
}

/// Transactional storage operations over rental items, orders and lines.
///
/// Every mutating method commits or rolls back as one unit. Status guards run
/// inside the same transaction that moves stock, which is what makes the
/// cancel/expiry race credit stock at most once per order.
#[async_trait]
pub trait RentalStore: Send + Sync {
    /// Insert a new rental item listing.
    async fn create_item(&self, item: NewItem) -> Result<RentalItem>;

    /// Fetch a rental item by id. Soft-deleted items are invisible.
    async fn item(&self, id: ItemId) -> Result<Option<RentalItem>>;

    /// Validate and commit a reservation as one transaction.
    ///
    /// Locks every referenced item, validates all lines (existence,
    /// availability, stock) before any mutation, then applies conditional
    /// decrements and inserts the order with its lines. Any failure rolls
    /// back every prior decrement of the same request.
    async fn create_order(&self, order: NewOrder) -> Result<OrderWithLines>;

    /// Fetch an order with its lines, scoped to the owning user.
    async fn order_for_user(&self, id: OrderId, user: UserId) -> Result<Option<OrderWithLines>>;

    /// List a user's orders, newest first, with optional status filter.
    async fn orders_for_user(&self, user: UserId, filter: OrderFilter) -> Result<OrderPage>;

    /// Orders referencing a given item, with their lines. Read-only view for
    /// the item owner.
    async fn orders_for_item(&self, item: ItemId) -> Result<Vec<OrderWithLines>>;

    /// Cancel a pending order, returning each line's quantity to its item and
    /// persisting the `Cancelled` status in the same transaction.
    ///
    /// Fails with `OrderNotFound` if the order is missing or not owned by
    /// `user`, and with `InvalidTransition` if the order is already terminal
    /// (in which case no stock moves).
    async fn cancel_order(&self, id: OrderId, user: UserId) -> Result<RentalOrder>;

    /// Soft-delete an order and cascade-soft-delete its lines.
    ///
    /// A still-pending order has its reserved stock returned first; terminal
    /// orders are deleted without touching stock (their reservation was
    /// already settled exactly once).
    async fn delete_order(&self, id: OrderId, user: UserId) -> Result<()>;

    /// Orders whose rental window has elapsed (`use_end < today`) and that
    /// are not yet completed, with lines eagerly loaded.
    async fn expired_orders(&self, today: NaiveDate) -> Result<Vec<OrderWithLines>>;

    /// Complete one expired order: re-check the status under lock, return
    /// each line's quantity and mark the order `Completed`, all in one
    /// transaction. Orders that turned terminal in the meantime are skipped.
    async fn complete_order(&self, id: OrderId) -> Result<CompletionOutcome>;
}
