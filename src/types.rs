//! Domain types for the rental reservation engine.
//!
//! Value objects (newtype identifiers, status enums) and the three entities
//! the engine owns: rental items, rental orders and their order lines.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a rental item.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Creates a new random `ItemId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `ItemId` from a `Uuid`.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a rental order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Creates a new random `OrderId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `OrderId` from a `Uuid`.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user.
///
/// Supplied by the upstream identity service; the engine trusts the value but
/// enforces ownership checks itself.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Status enums
// ============================================================================

/// Lifecycle status of a rental order.
///
/// Transitions are monotonic toward a terminal state:
/// `Pending -> Cancelled` (user cancel) or `Pending -> Completed` (expiry
/// sweep). Terminal states absorb; no transition leaves them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order holds reserved stock; the only non-terminal state.
    Pending,
    /// Cancelled by the user before the rental window elapsed. Terminal.
    Cancelled,
    /// Rental window elapsed and stock was returned by the sweeper. Terminal.
    Completed,
}

impl OrderStatus {
    /// Stored text form of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Parse the stored text form. Returns `None` for anything outside the
    /// closed set; callers treat that as a data-integrity error, never as a
    /// value to pass through.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "cancelled" => Some(Self::Cancelled),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Whether this status is terminal (no transitions out).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a rental item accepts new reservations.
///
/// Checked only at admission time; stock returns ignore the flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    /// Open for new reservations.
    Available,
    /// Suspended by the seller; new reservations are rejected.
    Unavailable,
}

impl Availability {
    /// Stored text form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Unavailable => "unavailable",
        }
    }

    /// Parse the stored text form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(Self::Available),
            "unavailable" => Some(Self::Unavailable),
            _ => None,
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A rental-capable product with a finite stock pool.
///
/// `quantity` is the available-to-reserve stock and is mutated exclusively
/// through atomic relative updates in the store layer.
#[derive(Clone, Debug, PartialEq)]
pub struct RentalItem {
    /// Item identity.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Per-day rental price in the smallest currency unit.
    pub price_per_day: i64,
    /// Available-to-reserve stock; never negative.
    pub quantity: i32,
    /// Whether new reservations are accepted.
    pub availability: Availability,
    /// Seller who listed the item.
    pub owner_id: UserId,
    /// Listing creation time.
    pub created_at: DateTime<Utc>,
}

/// One reservation request: status, denormalized total quantity and the
/// rental date window.
#[derive(Clone, Debug, PartialEq)]
pub struct RentalOrder {
    /// Order identity.
    pub id: OrderId,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Denormalized sum of all line quantities (informational).
    pub quantity: i32,
    /// First day of the rental window.
    pub use_start: NaiveDate,
    /// Day the rental ends; must be after `use_start`.
    pub use_end: NaiveDate,
    /// User who placed the order.
    pub user_id: UserId,
    /// Order creation time.
    pub created_at: DateTime<Utc>,
}

/// One item-and-quantity entry within an order.
///
/// Immutable once created; the multiset of lines determines exactly how much
/// stock must be returned if the order is cancelled, deleted or expires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderLine {
    /// Owning order.
    pub order_id: OrderId,
    /// Reserved item.
    pub item_id: ItemId,
    /// Quantity reserved from that item; always positive.
    pub quantity: i32,
}

/// An order together with its lines, as returned by admission and lookups.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderWithLines {
    /// The order record.
    pub order: RentalOrder,
    /// Its reservation lines.
    pub lines: Vec<OrderLine>,
}

/// One `(item, quantity)` pair of a reservation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineRequest {
    /// Item to reserve from.
    pub item_id: ItemId,
    /// Requested quantity; must be positive.
    pub quantity: i32,
}

/// Fields of a new rental item listing.
#[derive(Clone, Debug)]
pub struct NewItem {
    /// Display name.
    pub name: String,
    /// Per-day price in the smallest currency unit.
    pub price_per_day: i64,
    /// Initial stock.
    pub quantity: i32,
    /// Initial availability flag.
    pub availability: Availability,
    /// Listing seller.
    pub owner_id: UserId,
}

/// A validated reservation request, ready for the store's transactional
/// create-and-decrement.
#[derive(Clone, Debug)]
pub struct NewOrder {
    /// Requesting user.
    pub user_id: UserId,
    /// Normalized lines (one entry per item, positive quantities).
    pub lines: Vec<LineRequest>,
    /// First day of the rental window.
    pub use_start: NaiveDate,
    /// Day the rental ends.
    pub use_end: NaiveDate,
}
