//! Persistence
//!
//! Repository traits for orders and menus with two implementations:
//! [`PgStore`] over PostgreSQL and [`MemoryStore`] for development and tests.

pub mod memory;
pub mod menu;
pub mod orders;

pub use memory::MemoryStore;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{
    Assignee, ClaimDetails, MenuItem, MenuItemCreate, MenuItemUpdate, Order, OrderStatus,
};
use sqlx::PgPool;

use crate::error::ServiceResult;
use crate::orders::specs::SelectionMap;

/// Order ready for insertion, priced and normalized
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub merchant_id: i64,
    pub session_id: String,
    pub store_name: String,
    pub store_address: String,
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub menu_item_id: i64,
    pub quantity: i32,
    pub selected_specifications: SelectionMap,
}

/// Fields written together with a status change
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub to: OrderStatus,
    pub assignee: Option<Assignee>,
    pub claim: Option<ClaimDetails>,
}

impl StatusChange {
    pub fn to(status: OrderStatus) -> Self {
        Self {
            to: status,
            assignee: None,
            claim: None,
        }
    }
}

/// Result of a conditional status update
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    /// The order was in one of the expected statuses and has been updated
    Applied(Box<Order>),
    /// No order with that id
    Missing,
    /// The order exists but is in this other status; nothing was written
    Rejected(OrderStatus),
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert an order and its items atomically
    async fn insert_order(&self, order: NewOrder) -> ServiceResult<Order>;

    async fn find_order(&self, id: i64) -> ServiceResult<Option<Order>>;

    /// Order `id` only if it belongs to this merchant's session
    async fn find_order_for_session(
        &self,
        id: i64,
        merchant_id: i64,
        session_id: &str,
    ) -> ServiceResult<Option<Order>>;

    /// Newest order of the session whose status is active
    async fn find_active_order(
        &self,
        merchant_id: i64,
        session_id: &str,
    ) -> ServiceResult<Option<Order>>;

    /// All orders of a merchant, newest first
    async fn list_merchant_orders(&self, merchant_id: i64) -> ServiceResult<Vec<Order>>;

    /// Apply `change` only if the order's current status is one of `from`
    async fn transition(
        &self,
        id: i64,
        from: &[OrderStatus],
        change: StatusChange,
    ) -> ServiceResult<TransitionOutcome>;
}

#[async_trait]
pub trait MenuRepository: Send + Sync {
    /// Batch load of the given ids restricted to one merchant
    async fn find_items_for_merchant(
        &self,
        merchant_id: i64,
        ids: &[i64],
    ) -> ServiceResult<Vec<MenuItem>>;

    /// Items of a merchant ordered by id
    async fn list_menu(&self, merchant_id: i64, available_only: bool)
    -> ServiceResult<Vec<MenuItem>>;

    async fn create_menu_item(&self, data: &MenuItemCreate) -> ServiceResult<MenuItem>;

    /// `None` when the item does not exist
    async fn update_menu_item(
        &self,
        id: i64,
        data: &MenuItemUpdate,
    ) -> ServiceResult<Option<MenuItem>>;

    /// `false` when the item does not exist; `MenuItemInUse` when orders reference it
    async fn delete_menu_item(&self, id: i64) -> ServiceResult<bool>;

    async fn merchant_exists(&self, merchant_id: i64) -> ServiceResult<bool>;
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
