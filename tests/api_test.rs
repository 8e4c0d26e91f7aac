//! HTTP surface tests driven through the router with `tower::oneshot`.

#![allow(clippy::unwrap_used)]

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use rental_core::types::UserId;
use rental_core::{build_router, AppState, MemoryRentalStore, RentalStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn test_app() -> (Arc<MemoryRentalStore>, Router) {
    let store = Arc::new(MemoryRentalStore::new());
    let state = AppState::new(Arc::clone(&store) as Arc<dyn RentalStore>);
    (store, build_router(state))
}

fn request(method: Method, uri: &str, user: Option<UserId>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user.to_string());
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create_item(app: &Router, owner: UserId, quantity: i32) -> Value {
    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/items",
            Some(owner),
            Some(json!({
                "name": "camping tent",
                "price_per_day": 1500,
                "quantity": quantity,
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

fn order_payload(item_id: &Value, quantity: i32) -> Value {
    json!({
        "items": [{ "rental_item_id": item_id, "quantity": quantity }],
        "use_start": "2031-06-01",
        "use_end": "2031-06-05",
    })
}

#[tokio::test]
async fn health_endpoints_respond() {
    let (_store, app) = test_app();
    let response = app
        .clone()
        .oneshot(request(Method::GET, "/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(request(Method::GET, "/ready", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_identity_header_is_unauthorized() {
    let (_store, app) = test_app();
    let response = app
        .oneshot(request(Method::GET, "/api/orders", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn malformed_identity_header_is_unauthorized() {
    let (_store, app) = test_app();
    let req = Request::builder()
        .method(Method::GET)
        .uri("/api/orders")
        .header("x-user-id", "not-a-uuid")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn order_creation_reserves_stock() {
    let (_store, app) = test_app();
    let owner = UserId::new();
    let renter = UserId::new();
    let item = create_item(&app, owner, 5).await;

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/orders",
            Some(renter),
            Some(order_payload(&item["id"], 3)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let order = json_body(response).await;
    assert_eq!(order["order_status"], "pending");
    assert_eq!(order["quantity"], 3);
    assert_eq!(order["lines"][0]["quantity"], 3);

    let response = app
        .oneshot(request(
            Method::GET,
            &format!("/api/items/{}", item["id"].as_str().unwrap()),
            None,
            None,
        ))
        .await
        .unwrap();
    let reloaded = json_body(response).await;
    assert_eq!(reloaded["quantity"], 2);
}

#[tokio::test]
async fn oversubscribed_order_is_conflict_with_details() {
    let (_store, app) = test_app();
    let renter = UserId::new();
    let item = create_item(&app, UserId::new(), 2).await;

    let response = app
        .oneshot(request(
            Method::POST,
            "/api/orders",
            Some(renter),
            Some(order_payload(&item["id"], 3)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");
    assert_eq!(body["details"]["requested"], 3);
    assert_eq!(body["details"]["available"], 2);
}

#[tokio::test]
async fn cancel_via_status_update_returns_stock() {
    let (_store, app) = test_app();
    let renter = UserId::new();
    let item = create_item(&app, UserId::new(), 5).await;

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/orders",
            Some(renter),
            Some(order_payload(&item["id"], 3)),
        ))
        .await
        .unwrap();
    let order = json_body(response).await;

    let response = app
        .clone()
        .oneshot(request(
            Method::PUT,
            &format!("/api/orders/{}/status", order["id"].as_str().unwrap()),
            Some(renter),
            Some(json!({ "order_status": "cancelled" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cancelled = json_body(response).await;
    assert_eq!(cancelled["order_status"], "cancelled");

    let response = app
        .oneshot(request(
            Method::GET,
            &format!("/api/items/{}", item["id"].as_str().unwrap()),
            None,
            None,
        ))
        .await
        .unwrap();
    let reloaded = json_body(response).await;
    assert_eq!(reloaded["quantity"], 5);
}

#[tokio::test]
async fn status_update_without_target_is_bad_request() {
    let (_store, app) = test_app();
    let renter = UserId::new();
    let item = create_item(&app, UserId::new(), 5).await;

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/orders",
            Some(renter),
            Some(order_payload(&item["id"], 1)),
        ))
        .await
        .unwrap();
    let order = json_body(response).await;

    let response = app
        .oneshot(request(
            Method::PUT,
            &format!("/api/orders/{}/status", order["id"].as_str().unwrap()),
            Some(renter),
            Some(json!({})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn delete_responds_no_content_and_hides_order() {
    let (_store, app) = test_app();
    let renter = UserId::new();
    let item = create_item(&app, UserId::new(), 5).await;

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/orders",
            Some(renter),
            Some(order_payload(&item["id"], 2)),
        ))
        .await
        .unwrap();
    let order = json_body(response).await;
    let order_uri = format!("/api/orders/{}", order["id"].as_str().unwrap());

    let response = app
        .clone()
        .oneshot(request(Method::DELETE, &order_uri, Some(renter), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(request(Method::GET, &order_uri, Some(renter), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn orders_are_scoped_to_their_owner() {
    let (_store, app) = test_app();
    let renter = UserId::new();
    let stranger = UserId::new();
    let item = create_item(&app, UserId::new(), 5).await;

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/orders",
            Some(renter),
            Some(order_payload(&item["id"], 1)),
        ))
        .await
        .unwrap();
    let order = json_body(response).await;

    let response = app
        .oneshot(request(
            Method::GET,
            &format!("/api/orders/{}", order["id"].as_str().unwrap()),
            Some(stranger),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["code"], "ORDER_NOT_FOUND");
}

#[tokio::test]
async fn order_listing_paginates_and_filters_by_status() {
    let (_store, app) = test_app();
    let renter = UserId::new();
    let item = create_item(&app, UserId::new(), 50).await;

    let mut first_order_id = None;
    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/orders",
                Some(renter),
                Some(order_payload(&item["id"], 1)),
            ))
            .await
            .unwrap();
        let order = json_body(response).await;
        first_order_id.get_or_insert(order["id"].as_str().unwrap().to_string());
    }
    let first_order_id = first_order_id.unwrap();
    app.clone()
        .oneshot(request(
            Method::PUT,
            &format!("/api/orders/{first_order_id}/status"),
            Some(renter),
            Some(json!({ "order_status": "cancelled" })),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(request(
            Method::GET,
            "/api/orders?page=1&limit=2",
            Some(renter),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["orders"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["total_items"], 3);
    assert_eq!(body["pagination"]["total_pages"], 2);
    assert_eq!(body["pagination"]["current_page"], 1);

    let response = app
        .clone()
        .oneshot(request(
            Method::GET,
            "/api/orders?order_status=cancelled",
            Some(renter),
            None,
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    let orders = body["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], first_order_id.as_str());

    let response = app
        .oneshot(request(
            Method::GET,
            "/api/orders?order_status=bogus",
            Some(renter),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn item_orders_are_visible_to_the_owner_only() {
    let (store, app) = test_app();
    let owner = UserId::new();
    let renter = UserId::new();
    let item = common::seed_item_for(&store, 5, owner).await;
    let item_uri = format!("/api/items/{}/orders", item.id);

    app.clone()
        .oneshot(request(
            Method::POST,
            "/api/orders",
            Some(renter),
            Some(json!({
                "items": [{ "rental_item_id": item.id, "quantity": 2 }],
                "use_start": "2031-06-01",
                "use_end": "2031-06-05",
            })),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(request(Method::GET, &item_uri, Some(renter), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(request(Method::GET, &item_uri, Some(owner), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let orders = body.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["quantity"], 2);
    assert_eq!(orders[0]["order_status"], "pending");
}

#[tokio::test]
async fn invalid_item_payloads_are_rejected() {
    let (_store, app) = test_app();
    let owner = UserId::new();

    for payload in [
        json!({ "name": "  ", "price_per_day": 100, "quantity": 1 }),
        json!({ "name": "kayak", "price_per_day": -1, "quantity": 1 }),
        json!({ "name": "kayak", "price_per_day": 100, "quantity": -1 }),
    ] {
        let response = app
            .clone()
            .oneshot(request(Method::POST, "/api/items", Some(owner), Some(payload)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
