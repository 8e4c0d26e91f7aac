//! `PostgreSQL` implementation of the rental store.
//!
//! Every stock mutation is an atomic relative `UPDATE` (`quantity = quantity
//! ± $n`), and decrements carry a `quantity >= $n` guard so the `quantity >=
//! 0` invariant holds even if rows were mutated outside the lock. Multi-row
//! operations lock the affected rows with `SELECT ... FOR UPDATE` in a fixed
//! order before validating, so admission sees a consistent snapshot and two
//! admissions over the same items cannot deadlock.

use crate::error::{RentalError, Result};
use crate::stores::{CompletionOutcome, OrderFilter, OrderPage, RentalStore};
use crate::types::{
    Availability, ItemId, NewItem, NewOrder, OrderId, OrderLine, OrderStatus, OrderWithLines,
    RentalItem, RentalOrder, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use std::collections::HashMap;

/// `PostgreSQL`-backed rental store.
#[derive(Clone)]
pub struct PostgresRentalStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: ItemId,
    name: String,
    price_per_day: i64,
    quantity: i32,
    availability: String,
    owner_id: UserId,
    created_at: DateTime<Utc>,
}

impl ItemRow {
    fn into_item(self) -> Result<RentalItem> {
        let availability = Availability::parse(&self.availability).ok_or_else(|| {
            RentalError::Storage(format!(
                "item {} has unknown availability value {:?}",
                self.id, self.availability
            ))
        })?;
        Ok(RentalItem {
            id: self.id,
            name: self.name,
            price_per_day: self.price_per_day,
            quantity: self.quantity,
            availability,
            owner_id: self.owner_id,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    status: String,
    quantity: i32,
    use_start: NaiveDate,
    use_end: NaiveDate,
    user_id: UserId,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self) -> Result<RentalOrder> {
        let status = OrderStatus::parse(&self.status).ok_or_else(|| {
            RentalError::Storage(format!(
                "order {} has unknown status value {:?}",
                self.id, self.status
            ))
        })?;
        Ok(RentalOrder {
            id: self.id,
            status,
            quantity: self.quantity,
            use_start: self.use_start,
            use_end: self.use_end,
            user_id: self.user_id,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LineRow {
    order_id: OrderId,
    item_id: ItemId,
    quantity: i32,
}

impl From<LineRow> for OrderLine {
    fn from(row: LineRow) -> Self {
        Self {
            order_id: row.order_id,
            item_id: row.item_id,
            quantity: row.quantity,
        }
    }
}

const SELECT_ORDER: &str =
    "SELECT id, status, quantity, use_start, use_end, user_id, created_at FROM rental_orders";
const SELECT_ITEM: &str =
    "SELECT id, name, price_per_day, quantity, availability, owner_id, created_at FROM rental_items";

impl PostgresRentalStore {
    /// Create a new store on top of an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RentalError::Storage(format!("migration failed: {e}")))?;
        Ok(())
    }

    async fn lines_for_orders(&self, ids: &[OrderId]) -> Result<HashMap<OrderId, Vec<OrderLine>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<LineRow> = sqlx::query_as(
            "SELECT order_id, item_id, quantity FROM rental_order_lines
             WHERE order_id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RentalError::Storage(format!("failed to load order lines: {e}")))?;

        let mut by_order: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for row in rows {
            by_order.entry(row.order_id).or_default().push(row.into());
        }
        Ok(by_order)
    }
}

#[async_trait]
impl RentalStore for PostgresRentalStore {
    async fn create_item(&self, item: NewItem) -> Result<RentalItem> {
        let created = RentalItem {
            id: ItemId::new(),
            name: item.name,
            price_per_day: item.price_per_day,
            quantity: item.quantity,
            availability: item.availability,
            owner_id: item.owner_id,
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO rental_items (id, name, price_per_day, quantity, availability, owner_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(created.id)
        .bind(&created.name)
        .bind(created.price_per_day)
        .bind(created.quantity)
        .bind(created.availability.as_str())
        .bind(created.owner_id)
        .bind(created.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RentalError::Storage(format!("failed to create rental item: {e}")))?;

        Ok(created)
    }

    async fn item(&self, id: ItemId) -> Result<Option<RentalItem>> {
        let row: Option<ItemRow> =
            sqlx::query_as(&format!("{SELECT_ITEM} WHERE id = $1 AND deleted_at IS NULL"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RentalError::Storage(format!("failed to load rental item: {e}")))?;
        row.map(ItemRow::into_item).transpose()
    }

    async fn create_order(&self, order: NewOrder) -> Result<OrderWithLines> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RentalError::Storage(format!("failed to start transaction: {e}")))?;

        // Lock every referenced item in id order so concurrent admissions
        // over overlapping item sets cannot deadlock.
        let mut ids: Vec<ItemId> = order.lines.iter().map(|l| l.item_id).collect();
        ids.sort_unstable();
        ids.dedup();

        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            "{SELECT_ITEM} WHERE id = ANY($1) AND deleted_at IS NULL ORDER BY id FOR UPDATE"
        ))
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| RentalError::Storage(format!("failed to lock rental items: {e}")))?;

        let mut locked: HashMap<ItemId, RentalItem> = HashMap::with_capacity(rows.len());
        for row in rows {
            let item = row.into_item()?;
            locked.insert(item.id, item);
        }

        // Validate every line before any mutation: a failing line must leave
        // all stock untouched, with no compensation path to get wrong.
        for line in &order.lines {
            let item = locked
                .get(&line.item_id)
                .ok_or(RentalError::ItemNotFound(line.item_id))?;
            if item.availability != Availability::Available {
                return Err(RentalError::ItemUnavailable(item.id));
            }
            if line.quantity > item.quantity {
                return Err(RentalError::InsufficientStock {
                    item_id: item.id,
                    requested: line.quantity,
                    available: item.quantity,
                });
            }
        }

        for line in &order.lines {
            let result = sqlx::query(
                "UPDATE rental_items SET quantity = quantity - $2
                 WHERE id = $1 AND quantity >= $2",
            )
            .bind(line.item_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await
            .map_err(|e| RentalError::Storage(format!("failed to reserve stock: {e}")))?;

            // The row is locked and was just validated, so the guard can only
            // miss if something bypassed the lock. Treat it as corruption.
            if result.rows_affected() != 1 {
                return Err(RentalError::Storage(format!(
                    "stock decrement for item {} was rejected under lock",
                    line.item_id
                )));
            }
        }

        let total: i32 = order.lines.iter().map(|l| l.quantity).sum();
        let created = RentalOrder {
            id: OrderId::new(),
            status: OrderStatus::Pending,
            quantity: total,
            use_start: order.use_start,
            use_end: order.use_end,
            user_id: order.user_id,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO rental_orders (id, status, quantity, use_start, use_end, user_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(created.id)
        .bind(created.status.as_str())
        .bind(created.quantity)
        .bind(created.use_start)
        .bind(created.use_end)
        .bind(created.user_id)
        .bind(created.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| RentalError::Storage(format!("failed to create order: {e}")))?;

        let mut lines = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            sqlx::query(
                "INSERT INTO rental_order_lines (order_id, item_id, quantity) VALUES ($1, $2, $3)",
            )
            .bind(created.id)
            .bind(line.item_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await
            .map_err(|e| RentalError::Storage(format!("failed to create order line: {e}")))?;
            lines.push(OrderLine {
                order_id: created.id,
                item_id: line.item_id,
                quantity: line.quantity,
            });
        }

        tx.commit()
            .await
            .map_err(|e| RentalError::Storage(format!("failed to commit order: {e}")))?;

        Ok(OrderWithLines {
            order: created,
            lines,
        })
    }

    async fn order_for_user(&self, id: OrderId, user: UserId) -> Result<Option<OrderWithLines>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "{SELECT_ORDER} WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL"
        ))
        .bind(id)
        .bind(user)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RentalError::Storage(format!("failed to load order: {e}")))?;

        let Some(row) = row else { return Ok(None) };
        let order = row.into_order()?;
        let mut lines = self.lines_for_orders(&[order.id]).await?;
        let lines = lines.remove(&order.id).unwrap_or_default();
        Ok(Some(OrderWithLines { order, lines }))
    }

    async fn orders_for_user(&self, user: UserId, filter: OrderFilter) -> Result<OrderPage> {
        let status = filter.status.map(OrderStatus::as_str);
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM rental_orders
             WHERE user_id = $1 AND deleted_at IS NULL AND ($2::text IS NULL OR status = $2)",
        )
        .bind(user)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RentalError::Storage(format!("failed to count orders: {e}")))?;

        let limit = i64::from(filter.limit);
        let offset = i64::from(filter.page.saturating_sub(1)) * limit;
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "{SELECT_ORDER}
             WHERE user_id = $1 AND deleted_at IS NULL AND ($2::text IS NULL OR status = $2)
             ORDER BY created_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(user)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RentalError::Storage(format!("failed to list orders: {e}")))?;

        let orders = rows
            .into_iter()
            .map(OrderRow::into_order)
            .collect::<Result<Vec<_>>>()?;
        #[allow(clippy::cast_sign_loss)] // COUNT(*) is never negative
        Ok(OrderPage {
            orders,
            total: total as u64,
        })
    }

    async fn orders_for_item(&self, item: ItemId) -> Result<Vec<OrderWithLines>> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            "SELECT o.id, o.status, o.quantity, o.use_start, o.use_end, o.user_id, o.created_at
             FROM rental_orders o
             JOIN rental_order_lines l ON l.order_id = o.id
             WHERE l.item_id = $1 AND o.deleted_at IS NULL AND l.deleted_at IS NULL
             ORDER BY o.created_at DESC",
        )
        .bind(item)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RentalError::Storage(format!("failed to list orders for item: {e}")))?;

        let orders = rows
            .into_iter()
            .map(OrderRow::into_order)
            .collect::<Result<Vec<_>>>()?;
        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let mut lines = self.lines_for_orders(&ids).await?;
        Ok(orders
            .into_iter()
            .map(|order| {
                let lines = lines.remove(&order.id).unwrap_or_default();
                OrderWithLines { order, lines }
            })
            .collect())
    }

    async fn cancel_order(&self, id: OrderId, user: UserId) -> Result<RentalOrder> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RentalError::Storage(format!("failed to start transaction: {e}")))?;

        // Lock the order row: the status check and the stock return must be
        // atomic with respect to the sweeper completing this same order.
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "{SELECT_ORDER} WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL FOR UPDATE"
        ))
        .bind(id)
        .bind(user)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RentalError::Storage(format!("failed to lock order: {e}")))?;

        let mut order = row.ok_or(RentalError::OrderNotFound(id))?.into_order()?;
        if order.status.is_terminal() {
            return Err(RentalError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Cancelled,
            });
        }

        let lines: Vec<LineRow> = sqlx::query_as(
            "SELECT order_id, item_id, quantity FROM rental_order_lines
             WHERE order_id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| RentalError::Storage(format!("failed to load order lines: {e}")))?;

        for line in &lines {
            sqlx::query("UPDATE rental_items SET quantity = quantity + $2 WHERE id = $1")
                .bind(line.item_id)
                .bind(line.quantity)
                .execute(&mut *tx)
                .await
                .map_err(|e| RentalError::Storage(format!("failed to return stock: {e}")))?;
        }

        sqlx::query("UPDATE rental_orders SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(OrderStatus::Cancelled.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| RentalError::Storage(format!("failed to update order status: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| RentalError::Storage(format!("failed to commit cancellation: {e}")))?;

        order.status = OrderStatus::Cancelled;
        Ok(order)
    }

    async fn delete_order(&self, id: OrderId, user: UserId) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RentalError::Storage(format!("failed to start transaction: {e}")))?;

        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "{SELECT_ORDER} WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL FOR UPDATE"
        ))
        .bind(id)
        .bind(user)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RentalError::Storage(format!("failed to lock order: {e}")))?;

        let order = row.ok_or(RentalError::OrderNotFound(id))?.into_order()?;

        // Only a pending order still holds stock. Cancelled and completed
        // orders were settled exactly once already.
        if order.status == OrderStatus::Pending {
            let lines: Vec<LineRow> = sqlx::query_as(
                "SELECT order_id, item_id, quantity FROM rental_order_lines
                 WHERE order_id = $1 AND deleted_at IS NULL",
            )
            .bind(id)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| RentalError::Storage(format!("failed to load order lines: {e}")))?;

            for line in &lines {
                sqlx::query("UPDATE rental_items SET quantity = quantity + $2 WHERE id = $1")
                    .bind(line.item_id)
                    .bind(line.quantity)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| RentalError::Storage(format!("failed to return stock: {e}")))?;
            }
        }

        // Explicit cascade: the lines have no lifecycle of their own, so they
        // are soft-deleted together with the order.
        sqlx::query("UPDATE rental_orders SET deleted_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RentalError::Storage(format!("failed to delete order: {e}")))?;
        sqlx::query("UPDATE rental_order_lines SET deleted_at = NOW() WHERE order_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RentalError::Storage(format!("failed to delete order lines: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| RentalError::Storage(format!("failed to commit deletion: {e}")))?;
        Ok(())
    }

    async fn expired_orders(&self, today: NaiveDate) -> Result<Vec<OrderWithLines>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "{SELECT_ORDER} WHERE use_end < $1 AND status <> $2 AND deleted_at IS NULL"
        ))
        .bind(today)
        .bind(OrderStatus::Completed.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RentalError::Storage(format!("failed to select expired orders: {e}")))?;

        let orders = rows
            .into_iter()
            .map(OrderRow::into_order)
            .collect::<Result<Vec<_>>>()?;
        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let mut lines = self.lines_for_orders(&ids).await?;
        Ok(orders
            .into_iter()
            .map(|order| {
                let lines = lines.remove(&order.id).unwrap_or_default();
                OrderWithLines { order, lines }
            })
            .collect())
    }

    async fn complete_order(&self, id: OrderId) -> Result<CompletionOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RentalError::Storage(format!("failed to start transaction: {e}")))?;

        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "{SELECT_ORDER} WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RentalError::Storage(format!("failed to lock order: {e}")))?;

        let Some(row) = row else {
            return Ok(CompletionOutcome::Gone);
        };
        let order = row.into_order()?;

        // A concurrent cancel may have won the race since the expiry query
        // ran. Terminal states absorb: skip without touching stock.
        if order.status.is_terminal() {
            return Ok(CompletionOutcome::AlreadyTerminal(order.status));
        }

        let lines: Vec<LineRow> = sqlx::query_as(
            "SELECT order_id, item_id, quantity FROM rental_order_lines
             WHERE order_id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| RentalError::Storage(format!("failed to load order lines: {e}")))?;

        for line in &lines {
            sqlx::query("UPDATE rental_items SET quantity = quantity + $2 WHERE id = $1")
                .bind(line.item_id)
                .bind(line.quantity)
                .execute(&mut *tx)
                .await
                .map_err(|e| RentalError::Storage(format!("failed to return stock: {e}")))?;
        }

        sqlx::query("UPDATE rental_orders SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(OrderStatus::Completed.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| RentalError::Storage(format!("failed to update order status: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| RentalError::Storage(format!("failed to commit completion: {e}")))?;
        Ok(CompletionOutcome::Completed)
    }
}
