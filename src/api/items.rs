//! Rental item API endpoints.
//!
//! Item listing management proper lives elsewhere; these endpoints cover
//! the minimum the reservation engine needs: registering an item with its
//! stock pool, looking it up, and the owner's view of orders against it.

use super::{AppError, RequesterId};
use crate::error::RentalError;
use crate::server::state::AppState;
use crate::types::{Availability, ItemId, NewItem, RentalItem};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to register a rental item.
#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    /// Display name.
    pub name: String,
    /// Per-day price in the smallest currency unit.
    pub price_per_day: i64,
    /// Initial stock.
    pub quantity: i32,
    /// Initial availability; defaults to available.
    pub availability: Option<Availability>,
}

/// A rental item.
#[derive(Debug, Serialize)]
pub struct ItemResponse {
    /// Item id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Per-day price.
    pub price_per_day: i64,
    /// Available-to-reserve stock.
    pub quantity: i32,
    /// Availability flag.
    pub availability: Availability,
    /// Listing seller.
    pub owner_id: Uuid,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl From<RentalItem> for ItemResponse {
    fn from(item: RentalItem) -> Self {
        Self {
            id: *item.id.as_uuid(),
            name: item.name,
            price_per_day: item.price_per_day,
            quantity: item.quantity,
            availability: item.availability,
            owner_id: *item.owner_id.as_uuid(),
            created_at: item.created_at,
        }
    }
}

/// Register a rental item with its stock pool.
pub async fn create_item(
    requester: RequesterId,
    State(state): State<AppState>,
    Json(request): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::bad_request("item name is required"));
    }
    if request.price_per_day < 0 {
        return Err(AppError::bad_request("price must not be negative"));
    }
    if request.quantity < 0 {
        return Err(AppError::bad_request("stock must not be negative"));
    }

    let created = state
        .store
        .create_item(NewItem {
            name: request.name,
            price_per_day: request.price_per_day,
            quantity: request.quantity,
            availability: request.availability.unwrap_or(Availability::Available),
            owner_id: requester.0,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Fetch a rental item.
pub async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<ItemResponse>, AppError> {
    let item_id = ItemId::from_uuid(item_id);
    let item = state
        .store
        .item(item_id)
        .await?
        .ok_or(RentalError::ItemNotFound(item_id))?;
    Ok(Json(item.into()))
}

/// One order referencing the item, as seen by the item owner.
#[derive(Debug, Serialize)]
pub struct ItemOrderResponse {
    /// Order id.
    pub id: Uuid,
    /// Current status.
    pub order_status: crate::types::OrderStatus,
    /// Quantity of this item reserved by the order.
    pub quantity: i32,
    /// First day of the rental window.
    pub use_start: chrono::NaiveDate,
    /// Day the rental ends.
    pub use_end: chrono::NaiveDate,
}

/// List orders referencing an item. Restricted to the item owner.
pub async fn list_item_orders(
    requester: RequesterId,
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<Vec<ItemOrderResponse>>, AppError> {
    let item_id = ItemId::from_uuid(item_id);
    let item = state
        .store
        .item(item_id)
        .await?
        .ok_or(RentalError::ItemNotFound(item_id))?;
    if item.owner_id != requester.0 {
        return Err(AppError::forbidden("only the item owner may view its orders"));
    }

    let orders = state.store.orders_for_item(item_id).await?;
    Ok(Json(
        orders
            .into_iter()
            .map(|entry| {
                let reserved = entry
                    .lines
                    .iter()
                    .filter(|l| l.item_id == item_id)
                    .map(|l| l.quantity)
                    .sum();
                ItemOrderResponse {
                    id: *entry.order.id.as_uuid(),
                    order_status: entry.order.status,
                    quantity: reserved,
                    use_start: entry.order.use_start,
                    use_end: entry.order.use_end,
                }
            })
            .collect(),
    ))
}
