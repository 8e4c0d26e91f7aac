//! Order lifecycle tests: cancellation and deletion return exactly the
//! reserved stock, exactly once.

#![allow(clippy::unwrap_used)]

mod common;

use common::{days_from_now, line, seed_item};
use rental_core::types::{OrderId, OrderStatus, UserId};
use rental_core::{Admission, Lifecycle, MemoryRentalStore, RentalError, RentalStore};
use std::sync::Arc;

fn setup() -> (Arc<MemoryRentalStore>, Admission, Lifecycle) {
    let store = Arc::new(MemoryRentalStore::new());
    let dyn_store = Arc::clone(&store) as Arc<dyn RentalStore>;
    (
        store,
        Admission::new(Arc::clone(&dyn_store)),
        Lifecycle::new(dyn_store),
    )
}

#[tokio::test]
async fn cancel_returns_stock_and_marks_cancelled() {
    let (store, admission, lifecycle) = setup();
    let item = seed_item(&store, 5).await;
    let user = UserId::new();
    let created = admission
        .create_order(user, vec![line(&item, 3)], days_from_now(1), days_from_now(5))
        .await
        .unwrap();
    assert_eq!(store.stock(item.id), Some(2));

    let cancelled = lifecycle
        .update_status(created.order.id, user, OrderStatus::Cancelled)
        .await
        .unwrap();

    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(store.stock(item.id), Some(5));
}

#[tokio::test]
async fn second_cancel_is_rejected_without_further_credit() {
    let (store, admission, lifecycle) = setup();
    let item = seed_item(&store, 5).await;
    let user = UserId::new();
    let created = admission
        .create_order(user, vec![line(&item, 3)], days_from_now(1), days_from_now(5))
        .await
        .unwrap();

    lifecycle
        .update_status(created.order.id, user, OrderStatus::Cancelled)
        .await
        .unwrap();
    let err = lifecycle
        .update_status(created.order.id, user, OrderStatus::Cancelled)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RentalError::InvalidTransition {
            from: OrderStatus::Cancelled,
            to: OrderStatus::Cancelled,
        }
    );
    assert_eq!(store.stock(item.id), Some(5));
}

#[tokio::test]
async fn cancel_of_foreign_order_is_not_found() {
    let (store, admission, lifecycle) = setup();
    let item = seed_item(&store, 5).await;
    let owner = UserId::new();
    let created = admission
        .create_order(owner, vec![line(&item, 1)], days_from_now(1), days_from_now(2))
        .await
        .unwrap();

    let err = lifecycle
        .update_status(created.order.id, UserId::new(), OrderStatus::Cancelled)
        .await
        .unwrap_err();
    assert_eq!(err, RentalError::OrderNotFound(created.order.id));
    assert_eq!(store.stock(item.id), Some(4));
}

#[tokio::test]
async fn cancel_of_missing_order_is_not_found() {
    let (_store, _admission, lifecycle) = setup();
    let missing = OrderId::new();
    let err = lifecycle
        .update_status(missing, UserId::new(), OrderStatus::Cancelled)
        .await
        .unwrap_err();
    assert_eq!(err, RentalError::OrderNotFound(missing));
}

#[tokio::test]
async fn caller_cannot_request_completed() {
    let (store, admission, lifecycle) = setup();
    let item = seed_item(&store, 5).await;
    let user = UserId::new();
    let created = admission
        .create_order(user, vec![line(&item, 1)], days_from_now(1), days_from_now(2))
        .await
        .unwrap();

    let err = lifecycle
        .update_status(created.order.id, user, OrderStatus::Completed)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        RentalError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Completed,
        }
    );
    assert_eq!(store.stock(item.id), Some(4));
}

#[tokio::test]
async fn delete_of_pending_order_returns_stock_and_hides_order() {
    let (store, admission, lifecycle) = setup();
    let item = seed_item(&store, 5).await;
    let user = UserId::new();
    let created = admission
        .create_order(user, vec![line(&item, 2)], days_from_now(1), days_from_now(3))
        .await
        .unwrap();

    lifecycle.delete_order(created.order.id, user).await.unwrap();

    assert_eq!(store.stock(item.id), Some(5));
    let lookup = store.order_for_user(created.order.id, user).await.unwrap();
    assert!(lookup.is_none());
}

#[tokio::test]
async fn delete_of_cancelled_order_does_not_credit_again() {
    let (store, admission, lifecycle) = setup();
    let item = seed_item(&store, 5).await;
    let user = UserId::new();
    let created = admission
        .create_order(user, vec![line(&item, 2)], days_from_now(1), days_from_now(3))
        .await
        .unwrap();

    lifecycle
        .update_status(created.order.id, user, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(store.stock(item.id), Some(5));

    lifecycle.delete_order(created.order.id, user).await.unwrap();
    // Stock was already returned at cancel time.
    assert_eq!(store.stock(item.id), Some(5));
}

#[tokio::test]
async fn delete_of_deleted_order_is_not_found() {
    let (store, admission, lifecycle) = setup();
    let item = seed_item(&store, 5).await;
    let user = UserId::new();
    let created = admission
        .create_order(user, vec![line(&item, 1)], days_from_now(1), days_from_now(2))
        .await
        .unwrap();

    lifecycle.delete_order(created.order.id, user).await.unwrap();
    let err = lifecycle
        .delete_order(created.order.id, user)
        .await
        .unwrap_err();
    assert_eq!(err, RentalError::OrderNotFound(created.order.id));
    assert_eq!(store.stock(item.id), Some(5));
}
