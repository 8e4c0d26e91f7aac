//! Shared helpers for integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use chrono::{Duration, NaiveDate, Utc};
use rental_core::stores::RentalStore;
use rental_core::types::{
    Availability, LineRequest, NewItem, NewOrder, OrderWithLines, RentalItem, UserId,
};
use rental_core::MemoryRentalStore;

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// `n` days from today; negative values land in the past.
pub fn days_from_now(n: i64) -> NaiveDate {
    today() + Duration::days(n)
}

pub async fn seed_item(store: &MemoryRentalStore, quantity: i32) -> RentalItem {
    seed_item_for(store, quantity, UserId::new()).await
}

pub async fn seed_item_for(
    store: &MemoryRentalStore,
    quantity: i32,
    owner_id: UserId,
) -> RentalItem {
    store
        .create_item(NewItem {
            name: "camping tent".to_string(),
            price_per_day: 1500,
            quantity,
            availability: Availability::Available,
            owner_id,
        })
        .await
        .unwrap()
}

pub async fn seed_unavailable_item(store: &MemoryRentalStore, quantity: i32) -> RentalItem {
    store
        .create_item(NewItem {
            name: "projector".to_string(),
            price_per_day: 4000,
            quantity,
            availability: Availability::Unavailable,
            owner_id: UserId::new(),
        })
        .await
        .unwrap()
}

pub fn line(item: &RentalItem, quantity: i32) -> LineRequest {
    LineRequest {
        item_id: item.id,
        quantity,
    }
}

/// Insert a pending order directly at the store layer, bypassing admission's
/// date validation. Used to set up already-expired reservations.
pub async fn seed_order(
    store: &MemoryRentalStore,
    user_id: UserId,
    lines: Vec<LineRequest>,
    use_start: NaiveDate,
    use_end: NaiveDate,
) -> OrderWithLines {
    store
        .create_order(NewOrder {
            user_id,
            lines,
            use_start,
            use_end,
        })
        .await
        .unwrap()
}
