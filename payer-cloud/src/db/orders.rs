//! Order database operations (PostgreSQL)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::models::{Assignee, MenuItemSummary, Order, OrderItem, OrderStatus};
use sqlx::types::Json;
use std::collections::HashMap;

use super::{NewOrder, OrderRepository, PgStore, StatusChange, TransitionOutcome};
use crate::error::{ServiceError, ServiceResult};
use crate::orders::specs::{self, SelectionMap};

const ORDER_COLUMNS: &str = "id, merchant_id, session_id, store_name, store_address, \
     total_price, status, assignee_id, assignee_name, claim_code, qr_code_data, \
     created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    merchant_id: i64,
    session_id: String,
    store_name: String,
    store_address: String,
    total_price: Decimal,
    status: String,
    assignee_id: Option<i64>,
    assignee_name: Option<String>,
    claim_code: Option<String>,
    qr_code_data: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> ServiceResult<Order> {
        let status: OrderStatus = self
            .status
            .parse()
            .map_err(|e| ServiceError::Db(Box::new(e)))?;
        let assignee = match (self.assignee_id, self.assignee_name) {
            (Some(id), Some(name)) => Some(Assignee { id, name }),
            _ => None,
        };
        Ok(Order {
            id: self.id,
            merchant_id: self.merchant_id,
            session_id: self.session_id,
            store_name: self.store_name,
            store_address: self.store_address,
            total_price: self.total_price,
            status,
            assignee,
            claim_code: self.claim_code,
            qr_code_data: self.qr_code_data,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    menu_item_id: i64,
    quantity: i32,
    selected_specifications: Json<SelectionMap>,
    menu_name: String,
    menu_price: Decimal,
    menu_image_url: Option<String>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            menu_item_id: row.menu_item_id,
            quantity: row.quantity,
            selected_specifications: specs::denormalize(row.selected_specifications.0),
            menu_item: Some(MenuItemSummary {
                id: row.menu_item_id,
                name: row.menu_name,
                price: row.menu_price,
                image_url: row.menu_image_url,
            }),
        }
    }
}

fn status_strings(statuses: &[OrderStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

impl PgStore {
    /// Load items for the given order rows and assemble full orders, keeping row order
    async fn with_items(&self, rows: Vec<OrderRow>) -> ServiceResult<Vec<Order>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();

        let item_rows: Vec<OrderItemRow> = sqlx::query_as(
            r#"
            SELECT oi.id, oi.order_id, oi.menu_item_id, oi.quantity, oi.selected_specifications,
                   mi.name AS menu_name, mi.price AS menu_price, mi.image_url AS menu_image_url
            FROM order_items oi
            JOIN menu_items mi ON mi.id = oi.menu_item_id
            WHERE oi.order_id = ANY($1)
            ORDER BY oi.order_id, oi.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            by_order.entry(row.order_id).or_default().push(row.into());
        }

        rows.into_iter()
            .map(|row| {
                let items = by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect()
    }

    async fn with_items_one(&self, row: Option<OrderRow>) -> ServiceResult<Option<Order>> {
        match row {
            Some(row) => Ok(self.with_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn insert_order(&self, order: NewOrder) -> ServiceResult<Order> {
        let mut tx = self.pool.begin().await?;

        let row: OrderRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO orders (merchant_id, session_id, store_name, store_address, total_price, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order.merchant_id)
        .bind(&order.session_id)
        .bind(&order.store_name)
        .bind(&order.store_address)
        .bind(order.total_price)
        .bind(order.status.as_str())
        .fetch_one(&mut *tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, menu_item_id, quantity, selected_specifications)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(row.id)
            .bind(item.menu_item_id)
            .bind(item.quantity)
            .bind(Json(&item.selected_specifications))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let id = row.id;
        self.with_items_one(Some(row))
            .await?
            .ok_or_else(|| ServiceError::Db(format!("order {id} vanished after insert").into()))
    }

    async fn find_order(&self, id: i64) -> ServiceResult<Option<Order>> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        self.with_items_one(row).await
    }

    async fn find_order_for_session(
        &self,
        id: i64,
        merchant_id: i64,
        session_id: &str,
    ) -> ServiceResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND merchant_id = $2 AND session_id = $3"
        ))
        .bind(id)
        .bind(merchant_id)
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        self.with_items_one(row).await
    }

    async fn find_active_order(
        &self,
        merchant_id: i64,
        session_id: &str,
    ) -> ServiceResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE merchant_id = $1 AND session_id = $2 AND status = ANY($3)
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#
        ))
        .bind(merchant_id)
        .bind(session_id)
        .bind(status_strings(&OrderStatus::ACTIVE))
        .fetch_optional(&self.pool)
        .await?;
        self.with_items_one(row).await
    }

    async fn list_merchant_orders(&self, merchant_id: i64) -> ServiceResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE merchant_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(merchant_id)
        .fetch_all(&self.pool)
        .await?;
        self.with_items(rows).await
    }

    async fn transition(
        &self,
        id: i64,
        from: &[OrderStatus],
        change: StatusChange,
    ) -> ServiceResult<TransitionOutcome> {
        let (assignee_id, assignee_name) = match change.assignee {
            Some(a) => (Some(a.id), Some(a.name)),
            None => (None, None),
        };
        let (claim_code, qr_code_data) = match change.claim {
            Some(c) => (Some(c.claim_code), Some(c.qr_code_data)),
            None => (None, None),
        };

        let updated: Option<OrderRow> = sqlx::query_as(&format!(
            r#"
            UPDATE orders SET
                status = $2,
                assignee_id = COALESCE($3, assignee_id),
                assignee_name = COALESCE($4, assignee_name),
                claim_code = COALESCE($5, claim_code),
                qr_code_data = COALESCE($6, qr_code_data),
                updated_at = NOW()
            WHERE id = $1 AND status = ANY($7)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(change.to.as_str())
        .bind(assignee_id)
        .bind(assignee_name)
        .bind(claim_code)
        .bind(qr_code_data)
        .bind(status_strings(from))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            return Ok(match self.with_items_one(Some(row)).await? {
                Some(order) => TransitionOutcome::Applied(Box::new(order)),
                None => TransitionOutcome::Missing,
            });
        }

        let current: Option<(String,)> = sqlx::query_as("SELECT status FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match current {
            None => Ok(TransitionOutcome::Missing),
            Some((status,)) => {
                let status = status.parse().map_err(|e| ServiceError::Db(Box::new(e)))?;
                Ok(TransitionOutcome::Rejected(status))
            }
        }
    }
}
