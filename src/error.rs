//! Error taxonomy for the rental reservation engine.

use crate::types::{ItemId, OrderId, OrderStatus};
use thiserror::Error;

/// Result type alias for rental engine operations.
pub type Result<T> = std::result::Result<T, RentalError>;

/// All failure modes of admission, lifecycle and sweep operations.
///
/// Validation errors are raised before any mutation; storage faults surface
/// after the transaction has already rolled back, so retrying the whole
/// request is safe.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RentalError {
    /// Malformed input: missing lines, non-positive quantity, bad date range
    /// or a missing target status.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A referenced rental item does not exist.
    #[error("rental item {0} not found")]
    ItemNotFound(ItemId),

    /// The item exists but is flagged unavailable for new reservations.
    #[error("rental item {0} is not available for reservation")]
    ItemUnavailable(ItemId),

    /// Requested quantity exceeds the available stock. Carries enough detail
    /// for the caller to adjust and retry.
    #[error("insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Item that could not cover the request.
        item_id: ItemId,
        /// Quantity the caller asked for.
        requested: i32,
        /// Quantity actually available at validation time.
        available: i32,
    },

    /// Order does not exist or does not belong to the requester.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// Status change attempted from or to a disallowed state.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Status the order currently has.
        from: OrderStatus,
        /// Status the caller asked for.
        to: OrderStatus,
    },

    /// Underlying transactional operation failed; all partial effects were
    /// rolled back.
    #[error("storage failure: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemId;

    #[test]
    fn insufficient_stock_message_names_item_and_quantities() {
        let item_id = ItemId::new();
        let err = RentalError::InsufficientStock {
            item_id,
            requested: 3,
            available: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains(&item_id.to_string()));
        assert!(msg.contains("requested 3"));
        assert!(msg.contains("available 2"));
    }

    #[test]
    fn transition_message_names_both_states() {
        let err = RentalError::InvalidTransition {
            from: OrderStatus::Cancelled,
            to: OrderStatus::Cancelled,
        };
        assert_eq!(
            err.to_string(),
            "invalid status transition from cancelled to cancelled"
        );
    }
}
