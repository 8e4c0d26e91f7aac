//! In-memory rental store for tests and demos.
//!
//! Mirrors the Postgres implementation's semantics behind one mutex: every
//! trait method takes the lock once and applies its whole effect before
//! releasing it, which is the in-memory equivalent of the transactional
//! guarantees the real store gets from row locks.

use crate::error::{RentalError, Result};
use crate::stores::{CompletionOutcome, OrderFilter, OrderPage, RentalStore};
use crate::types::{
    Availability, ItemId, NewItem, NewOrder, OrderId, OrderLine, OrderStatus, OrderWithLines,
    RentalItem, RentalOrder, UserId,
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Tables {
    items: HashMap<ItemId, RentalItem>,
    orders: HashMap<OrderId, RentalOrder>,
    lines: HashMap<OrderId, Vec<OrderLine>>,
    deleted_orders: HashSet<OrderId>,
}

/// Mutex-guarded in-memory implementation of [`RentalStore`].
#[derive(Default)]
pub struct MemoryRentalStore {
    inner: Mutex<Tables>,
}

impl MemoryRentalStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current stock of an item, for test assertions.
    #[must_use]
    pub fn stock(&self, id: ItemId) -> Option<i32> {
        self.lock().items.get(&id).map(|i| i.quantity)
    }
}

fn with_lines(tables: &Tables, order: RentalOrder) -> OrderWithLines {
    let lines = tables.lines.get(&order.id).cloned().unwrap_or_default();
    OrderWithLines { order, lines }
}

#[async_trait]
impl RentalStore for MemoryRentalStore {
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
        self.lock().items.insert(created.id, created.clone());
        Ok(created)
    }

    async fn item(&self, id: ItemId) -> Result<Option<RentalItem>> {
        Ok(self.lock().items.get(&id).cloned())
    }

    async fn create_order(&self, order: NewOrder) -> Result<OrderWithLines> {
        let mut tables = self.lock();

        // Same validate-then-commit shape as the Postgres store: all lines
        // checked before any decrement.
        for line in &order.lines {
            let item = tables
                .items
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
            if let Some(item) = tables.items.get_mut(&line.item_id) {
                item.quantity -= line.quantity;
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
        let lines: Vec<OrderLine> = order
            .lines
            .iter()
            .map(|l| OrderLine {
                order_id: created.id,
                item_id: l.item_id,
                quantity: l.quantity,
            })
            .collect();
        tables.orders.insert(created.id, created.clone());
        tables.lines.insert(created.id, lines.clone());

        Ok(OrderWithLines {
            order: created,
            lines,
        })
    }

    async fn order_for_user(&self, id: OrderId, user: UserId) -> Result<Option<OrderWithLines>> {
        let tables = self.lock();
        if tables.deleted_orders.contains(&id) {
            return Ok(None);
        }
        Ok(tables
            .orders
            .get(&id)
            .filter(|o| o.user_id == user)
            .cloned()
            .map(|o| with_lines(&tables, o)))
    }

    async fn orders_for_user(&self, user: UserId, filter: OrderFilter) -> Result<OrderPage> {
        let tables = self.lock();
        let mut matching: Vec<RentalOrder> = tables
            .orders
            .values()
            .filter(|o| o.user_id == user && !tables.deleted_orders.contains(&o.id))
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let offset = filter.page.saturating_sub(1) as usize * filter.limit as usize;
        let orders = matching
            .into_iter()
            .skip(offset)
            .take(filter.limit as usize)
            .collect();
        Ok(OrderPage { orders, total })
    }

    async fn orders_for_item(&self, item: ItemId) -> Result<Vec<OrderWithLines>> {
        let tables = self.lock();
        let mut matching: Vec<RentalOrder> = tables
            .orders
            .values()
            .filter(|o| !tables.deleted_orders.contains(&o.id))
            .filter(|o| {
                tables
                    .lines
                    .get(&o.id)
                    .is_some_and(|lines| lines.iter().any(|l| l.item_id == item))
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching
            .into_iter()
            .map(|o| with_lines(&tables, o))
            .collect())
    }

    async fn cancel_order(&self, id: OrderId, user: UserId) -> Result<RentalOrder> {
        let mut tables = self.lock();
        if tables.deleted_orders.contains(&id) {
            return Err(RentalError::OrderNotFound(id));
        }
        let current = tables
            .orders
            .get(&id)
            .filter(|o| o.user_id == user)
            .ok_or(RentalError::OrderNotFound(id))?;
        if current.status.is_terminal() {
            return Err(RentalError::InvalidTransition {
                from: current.status,
                to: OrderStatus::Cancelled,
            });
        }

        let lines = tables.lines.get(&id).cloned().unwrap_or_default();
        for line in &lines {
            if let Some(item) = tables.items.get_mut(&line.item_id) {
                item.quantity += line.quantity;
            }
        }
        let order = tables
            .orders
            .get_mut(&id)
            .ok_or(RentalError::OrderNotFound(id))?;
        order.status = OrderStatus::Cancelled;
        Ok(order.clone())
    }

    async fn delete_order(&self, id: OrderId, user: UserId) -> Result<()> {
        let mut tables = self.lock();
        if tables.deleted_orders.contains(&id) {
            return Err(RentalError::OrderNotFound(id));
        }
        let order = tables
            .orders
            .get(&id)
            .filter(|o| o.user_id == user)
            .cloned()
            .ok_or(RentalError::OrderNotFound(id))?;

        if order.status == OrderStatus::Pending {
            let lines = tables.lines.get(&id).cloned().unwrap_or_default();
            for line in &lines {
                if let Some(item) = tables.items.get_mut(&line.item_id) {
                    item.quantity += line.quantity;
                }
            }
        }
        tables.deleted_orders.insert(id);
        Ok(())
    }

    async fn expired_orders(&self, today: NaiveDate) -> Result<Vec<OrderWithLines>> {
        let tables = self.lock();
        Ok(tables
            .orders
            .values()
            .filter(|o| {
                o.use_end < today
                    && o.status != OrderStatus::Completed
                    && !tables.deleted_orders.contains(&o.id)
            })
            .cloned()
            .map(|o| with_lines(&tables, o))
            .collect())
    }

    async fn complete_order(&self, id: OrderId) -> Result<CompletionOutcome> {
        let mut tables = self.lock();
        if tables.deleted_orders.contains(&id) {
            return Ok(CompletionOutcome::Gone);
        }
        let Some(current) = tables.orders.get(&id) else {
            return Ok(CompletionOutcome::Gone);
        };
        if current.status.is_terminal() {
            return Ok(CompletionOutcome::AlreadyTerminal(current.status));
        }

        let lines = tables.lines.get(&id).cloned().unwrap_or_default();
        for line in &lines {
            if let Some(item) = tables.items.get_mut(&line.item_id) {
                item.quantity += line.quantity;
            }
        }
        if let Some(order) = tables.orders.get_mut(&id) {
            order.status = OrderStatus::Completed;
        }
        Ok(CompletionOutcome::Completed)
    }
}
