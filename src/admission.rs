//! Order admission: validate a reservation request and commit it atomically.

use crate::error::{RentalError, Result};
use crate::stores::RentalStore;
use crate::types::{LineRequest, NewOrder, OrderWithLines, UserId};
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Validates reservation requests and drives the store's
/// check-and-decrement transaction.
#[derive(Clone)]
pub struct Admission {
    store: Arc<dyn RentalStore>,
}

impl Admission {
    /// Create a new admission component.
    #[must_use]
    pub fn new(store: Arc<dyn RentalStore>) -> Self {
        Self { store }
    }

    /// Validate and commit a rental reservation.
    ///
    /// Request-shape checks (empty lines, non-positive quantities, date
    /// window) happen here before anything touches storage; stock and
    /// availability checks happen inside the store's single transaction, so
    /// a failure at any point leaves no partial reservation.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` for malformed input.
    /// - `ItemNotFound` / `ItemUnavailable` / `InsufficientStock` from stock
    ///   validation, naming the offending item.
    /// - `Storage` if the transaction fails (fully rolled back).
    pub async fn create_order(
        &self,
        user_id: UserId,
        lines: Vec<LineRequest>,
        use_start: NaiveDate,
        use_end: NaiveDate,
    ) -> Result<OrderWithLines> {
        if lines.is_empty() {
            return Err(RentalError::InvalidRequest(
                "at least one order line is required".to_string(),
            ));
        }
        if lines.iter().any(|l| l.quantity <= 0) {
            return Err(RentalError::InvalidRequest(
                "line quantities must be positive".to_string(),
            ));
        }
        let today = Utc::now().date_naive();
        if use_start < today {
            return Err(RentalError::InvalidRequest(
                "rental start must not be in the past".to_string(),
            ));
        }
        if use_start >= use_end {
            return Err(RentalError::InvalidRequest(
                "rental end must be after rental start".to_string(),
            ));
        }

        let lines = normalize(lines)?;
        let created = self
            .store
            .create_order(NewOrder {
                user_id,
                lines,
                use_start,
                use_end,
            })
            .await?;

        tracing::info!(
            order_id = %created.order.id,
            user_id = %user_id,
            quantity = created.order.quantity,
            lines = created.lines.len(),
            %use_start,
            %use_end,
            "rental order created"
        );
        Ok(created)
    }
}

/// Merge duplicate item references into one line per item, preserving first
/// appearance order.
fn normalize(lines: Vec<LineRequest>) -> Result<Vec<LineRequest>> {
    let mut order: Vec<crate::types::ItemId> = Vec::new();
    let mut merged: BTreeMap<crate::types::ItemId, i32> = BTreeMap::new();
    for line in lines {
        let entry = merged.entry(line.item_id).or_insert_with(|| {
            order.push(line.item_id);
            0
        });
        *entry = entry.checked_add(line.quantity).ok_or_else(|| {
            RentalError::InvalidRequest("requested quantity overflows".to_string())
        })?;
    }
    Ok(order
        .into_iter()
        .filter_map(|item_id| {
            merged
                .get(&item_id)
                .map(|&quantity| LineRequest { item_id, quantity })
        })
        .collect())
}
