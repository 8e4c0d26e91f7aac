//! Rental order API endpoints.
//!
//! - `POST   /api/orders`            create a reservation
//! - `GET    /api/orders`            list own orders (status filter, paging)
//! - `GET    /api/orders/:id`        own order detail with lines
//! - `PUT    /api/orders/:id/status` change status (cancel)
//! - `DELETE /api/orders/:id`        delete an order

use super::{AppError, RequesterId};
use crate::error::RentalError;
use crate::server::state::AppState;
use crate::stores::OrderFilter;
use crate::types::{LineRequest, OrderStatus, OrderWithLines};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MAX_PAGE_SIZE: u32 = 100;

/// One requested line of a reservation.
#[derive(Debug, Deserialize)]
pub struct LineRequestBody {
    /// Item to reserve from.
    pub rental_item_id: Uuid,
    /// Quantity to reserve.
    pub quantity: i32,
}

/// Request to create a rental order.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Items and quantities to reserve.
    pub items: Vec<LineRequestBody>,
    /// First day of the rental window.
    pub use_start: NaiveDate,
    /// Day the rental ends.
    pub use_end: NaiveDate,
}

/// One line of an order response.
#[derive(Debug, Serialize)]
pub struct LineResponse {
    /// Reserved item.
    pub rental_item_id: Uuid,
    /// Reserved quantity.
    pub quantity: i32,
}

/// An order with its lines.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    /// Order id.
    pub id: Uuid,
    /// Current status.
    pub order_status: OrderStatus,
    /// Total reserved quantity.
    pub quantity: i32,
    /// First day of the rental window.
    pub use_start: NaiveDate,
    /// Day the rental ends.
    pub use_end: NaiveDate,
    /// Reservation lines.
    pub lines: Vec<LineResponse>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl From<OrderWithLines> for OrderResponse {
    fn from(value: OrderWithLines) -> Self {
        Self {
            id: *value.order.id.as_uuid(),
            order_status: value.order.status,
            quantity: value.order.quantity,
            use_start: value.order.use_start,
            use_end: value.order.use_end,
            lines: value
                .lines
                .into_iter()
                .map(|l| LineResponse {
                    rental_item_id: *l.item_id.as_uuid(),
                    quantity: l.quantity,
                })
                .collect(),
            created_at: value.order.created_at,
        }
    }
}

/// Create a new rental order.
pub async fn create_order(
    requester: RequesterId,
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    let lines: Vec<LineRequest> = request
        .items
        .into_iter()
        .map(|l| LineRequest {
            item_id: crate::types::ItemId::from_uuid(l.rental_item_id),
            quantity: l.quantity,
        })
        .collect();

    let created = state
        .admission
        .create_order(requester.0, lines, request.use_start, request.use_end)
        .await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Query parameters for the order listing.
#[derive(Debug, Deserialize)]
pub struct ListOrdersParams {
    /// Restrict to one status.
    pub order_status: Option<String>,
    /// 1-based page number.
    pub page: Option<u32>,
    /// Page size (max 100).
    pub limit: Option<u32>,
}

/// Pagination metadata.
#[derive(Debug, Serialize)]
pub struct Pagination {
    /// Total matching orders.
    pub total_items: u64,
    /// Total pages at the current limit.
    pub total_pages: u64,
    /// Current page.
    pub current_page: u32,
    /// Page size.
    pub limit: u32,
}

/// Order listing response.
#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    /// Orders on this page, newest first.
    pub orders: Vec<OrderSummary>,
    /// Paging metadata.
    pub pagination: Pagination,
}

/// Summary of one order for the list view.
#[derive(Debug, Serialize)]
pub struct OrderSummary {
    /// Order id.
    pub id: Uuid,
    /// Current status.
    pub order_status: OrderStatus,
    /// Total reserved quantity.
    pub quantity: i32,
    /// First day of the rental window.
    pub use_start: NaiveDate,
    /// Day the rental ends.
    pub use_end: NaiveDate,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// List the requester's orders, newest first.
pub async fn list_orders(
    requester: RequesterId,
    State(state): State<AppState>,
    Query(params): Query<ListOrdersParams>,
) -> Result<Json<OrderListResponse>, AppError> {
    let status = match params.order_status.as_deref() {
        None => None,
        Some(raw) => Some(OrderStatus::parse(raw).ok_or_else(|| {
            AppError::bad_request(format!("unknown order status {raw:?}"))
        })?),
    };
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(10).clamp(1, MAX_PAGE_SIZE);

    let result = state
        .store
        .orders_for_user(
            requester.0,
            OrderFilter {
                status,
                page,
                limit,
            },
        )
        .await?;

    let total_pages = result.total.div_ceil(u64::from(limit));
    Ok(Json(OrderListResponse {
        orders: result
            .orders
            .into_iter()
            .map(|o| OrderSummary {
                id: *o.id.as_uuid(),
                order_status: o.status,
                quantity: o.quantity,
                use_start: o.use_start,
                use_end: o.use_end,
                created_at: o.created_at,
            })
            .collect(),
        pagination: Pagination {
            total_items: result.total,
            total_pages,
            current_page: page,
            limit,
        },
    }))
}

/// Fetch one of the requester's orders with its lines.
pub async fn get_order(
    requester: RequesterId,
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let order_id = crate::types::OrderId::from_uuid(order_id);
    let order = state
        .store
        .order_for_user(order_id, requester.0)
        .await?
        .ok_or(RentalError::OrderNotFound(order_id))?;
    Ok(Json(order.into()))
}

/// Request to change an order's status.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// Target status; required.
    pub order_status: Option<String>,
}

/// Update an order's status (cancel).
pub async fn update_order_status(
    requester: RequesterId,
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    let raw = request
        .order_status
        .ok_or_else(|| AppError::bad_request("a target order status is required"))?;
    let target = OrderStatus::parse(&raw)
        .ok_or_else(|| AppError::bad_request(format!("unknown order status {raw:?}")))?;

    let order_id = crate::types::OrderId::from_uuid(order_id);
    let order = state
        .lifecycle
        .update_status(order_id, requester.0, target)
        .await?;
    let lines = state
        .store
        .order_for_user(order_id, requester.0)
        .await?
        .map(|o| o.lines)
        .unwrap_or_default();
    Ok(Json(OrderWithLines { order, lines }.into()))
}

/// Delete one of the requester's orders.
pub async fn delete_order(
    requester: RequesterId,
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let order_id = crate::types::OrderId::from_uuid(order_id);
    state.lifecycle.delete_order(order_id, requester.0).await?;
    Ok(StatusCode::NO_CONTENT)
}
