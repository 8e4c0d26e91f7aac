//! Order lifecycle: user-initiated status changes and deletion.
//!
//! The state machine is small and strict: `Pending -> Cancelled` on user
//! cancel, `Pending -> Completed` only via the sweeper, and nothing leaves a
//! terminal state. Every path that takes a reservation out of active
//! standing returns exactly the stock admission removed, exactly once.

use crate::error::{RentalError, Result};
use crate::stores::RentalStore;
use crate::types::{OrderId, OrderStatus, RentalOrder, UserId};
use std::sync::Arc;

/// Handles cancellation and deletion of existing reservations.
#[derive(Clone)]
pub struct Lifecycle {
    store: Arc<dyn RentalStore>,
}

impl Lifecycle {
    /// Create a new lifecycle component.
    #[must_use]
    pub fn new(store: Arc<dyn RentalStore>) -> Self {
        Self { store }
    }

    /// Change an order's status on behalf of its owner.
    ///
    /// Only `Cancelled` is a valid caller-requested target; `Completed` is
    /// reserved for the expiry sweep and `Pending` is never re-entered.
    /// Cancelling returns each line's reserved quantity to its item in the
    /// same transaction that persists the new status.
    ///
    /// # Errors
    ///
    /// - `OrderNotFound` if the order is missing or not owned by `requester`.
    /// - `InvalidTransition` if the order is already terminal, or the target
    ///   is not `Cancelled`.
    pub async fn update_status(
        &self,
        order_id: OrderId,
        requester: UserId,
        new_status: OrderStatus,
    ) -> Result<RentalOrder> {
        match new_status {
            OrderStatus::Cancelled => {
                let order = self.store.cancel_order(order_id, requester).await?;
                tracing::info!(
                    order_id = %order.id,
                    user_id = %requester,
                    quantity = order.quantity,
                    "rental order cancelled, stock returned"
                );
                Ok(order)
            }
            other => {
                let current = self
                    .store
                    .order_for_user(order_id, requester)
                    .await?
                    .ok_or(RentalError::OrderNotFound(order_id))?;
                Err(RentalError::InvalidTransition {
                    from: current.order.status,
                    to: other,
                })
            }
        }
    }

    /// Soft-delete an order owned by `requester`.
    ///
    /// A still-pending order has its reserved stock returned first; the
    /// order's lines are cascade-soft-deleted with it.
    ///
    /// # Errors
    ///
    /// `OrderNotFound` if the order is missing or not owned by `requester`;
    /// `Storage` on transactional failure (fully rolled back).
    pub async fn delete_order(&self, order_id: OrderId, requester: UserId) -> Result<()> {
        self.store.delete_order(order_id, requester).await?;
        tracing::info!(order_id = %order_id, user_id = %requester, "rental order deleted");
        Ok(())
    }
}
