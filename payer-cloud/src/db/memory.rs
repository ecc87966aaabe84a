//! In-memory store
//!
//! Backs development runs without `DATABASE_URL` and the test suite. Every
//! operation runs under one `parking_lot::Mutex`, so inserts observe the
//! active-order rule and transitions are compare-and-set like their SQL
//! counterparts.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    Merchant, MenuItem, MenuItemCreate, MenuItemUpdate, Order, OrderItem, OrderStatus, SpecOption,
    SpecOptionInput, Specification, SpecificationInput,
};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{
    MenuRepository, NewOrder, OrderRepository, StatusChange, TransitionOutcome,
};
use crate::error::{ServiceError, ServiceResult};
use crate::orders::specs;

#[derive(Default)]
struct Counters {
    merchant: i64,
    menu_item: i64,
    specification: i64,
    option: i64,
    order: i64,
    order_item: i64,
}

fn bump(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Default)]
struct MemoryData {
    merchants: BTreeMap<i64, Merchant>,
    menu_items: BTreeMap<i64, MenuItem>,
    orders: BTreeMap<i64, Order>,
    ids: Counters,
}

impl MemoryData {
    fn build_specifications(&mut self, input: &[SpecificationInput]) -> Vec<Specification> {
        input
            .iter()
            .map(|spec| Specification {
                id: bump(&mut self.ids.specification),
                name: spec.name.clone(),
                options: spec
                    .options
                    .iter()
                    .map(|o| SpecOption {
                        id: bump(&mut self.ids.option),
                        name: o.name.clone(),
                        price_change: o.price_change,
                    })
                    .collect(),
            })
            .collect()
    }

    fn newest_first(orders: &mut [Order]) {
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    }
}

/// Mutex-guarded maps implementing both repositories
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_merchant(&self, name: &str) -> i64 {
        let mut data = self.inner.lock();
        let id = bump(&mut data.ids.merchant);
        data.merchants.insert(
            id,
            Merchant {
                id,
                name: name.to_string(),
            },
        );
        id
    }

    /// One demo merchant with a small coffee menu
    pub fn with_demo_data() -> Self {
        let store = Self::new();
        let merchant_id = store.add_merchant("Payer Demo Coffee");

        let option = |name: &str, delta: i64| SpecOptionInput {
            name: name.into(),
            price_change: Decimal::from(delta),
        };
        let spec = |name: &str, options: Vec<SpecOptionInput>| SpecificationInput {
            name: name.into(),
            options,
        };
        let items = [
            MenuItemCreate {
                merchant_id,
                name: "Latte".into(),
                price: Decimal::from(26),
                original_price: Some(Decimal::from(32)),
                description: Some("Espresso with steamed milk".into()),
                image_url: None,
                is_available: Some(true),
                specifications: Some(vec![
                    spec("temperature", vec![option("hot", 0), option("iced", 0)]),
                    spec("milk", vec![option("regular", 0), option("extra milk", 5)]),
                ]),
            },
            MenuItemCreate {
                merchant_id,
                name: "Americano".into(),
                price: Decimal::from(20),
                original_price: None,
                description: None,
                image_url: None,
                is_available: Some(true),
                specifications: Some(vec![spec(
                    "size",
                    vec![option("regular", 0), option("large", 3)],
                )]),
            },
            MenuItemCreate {
                merchant_id,
                name: "Seasonal Tea".into(),
                price: Decimal::from(18),
                original_price: None,
                description: None,
                image_url: None,
                is_available: Some(false),
                specifications: None,
            },
        ];
        for item in &items {
            store.insert_menu_item(item);
        }
        store
    }

    fn insert_menu_item(&self, data: &MenuItemCreate) -> MenuItem {
        let mut guard = self.inner.lock();
        let id = bump(&mut guard.ids.menu_item);
        let specifications = guard.build_specifications(data.specifications.as_deref().unwrap_or_default());
        let item = MenuItem {
            id,
            merchant_id: data.merchant_id,
            name: data.name.clone(),
            price: data.price,
            original_price: data.original_price,
            description: data.description.clone(),
            image_url: data.image_url.clone(),
            is_available: data.is_available.unwrap_or(true),
            specifications,
        };
        guard.menu_items.insert(id, item.clone());
        item
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn insert_order(&self, order: NewOrder) -> ServiceResult<Order> {
        let mut guard = self.inner.lock();
        let data = &mut *guard;

        if order.status.is_active()
            && data.orders.values().any(|o| {
                o.merchant_id == order.merchant_id
                    && o.session_id == order.session_id
                    && o.status.is_active()
            })
        {
            return Err(AppError::new(ErrorCode::ActiveOrderExists).into());
        }

        let order_id = data.ids.order + 1;
        let mut items = Vec::with_capacity(order.items.len());
        for line in order.items {
            let menu_item = data.menu_items.get(&line.menu_item_id).ok_or_else(|| {
                ServiceError::Db(format!("menu item {} does not exist", line.menu_item_id).into())
            })?;
            items.push(OrderItem {
                id: 0,
                order_id,
                menu_item_id: line.menu_item_id,
                quantity: line.quantity,
                selected_specifications: specs::denormalize(line.selected_specifications),
                menu_item: Some(menu_item.summary()),
            });
        }
        for item in &mut items {
            item.id = bump(&mut data.ids.order_item);
        }
        data.ids.order = order_id;

        let now = Utc::now();
        let stored = Order {
            id: order_id,
            merchant_id: order.merchant_id,
            session_id: order.session_id,
            store_name: order.store_name,
            store_address: order.store_address,
            total_price: order.total_price,
            status: order.status,
            assignee: None,
            claim_code: None,
            qr_code_data: None,
            items,
            created_at: now,
            updated_at: now,
        };
        data.orders.insert(order_id, stored.clone());
        Ok(stored)
    }

    async fn find_order(&self, id: i64) -> ServiceResult<Option<Order>> {
        Ok(self.inner.lock().orders.get(&id).cloned())
    }

    async fn find_order_for_session(
        &self,
        id: i64,
        merchant_id: i64,
        session_id: &str,
    ) -> ServiceResult<Option<Order>> {
        Ok(self
            .inner
            .lock()
            .orders
            .get(&id)
            .filter(|o| o.merchant_id == merchant_id && o.session_id == session_id)
            .cloned())
    }

    async fn find_active_order(
        &self,
        merchant_id: i64,
        session_id: &str,
    ) -> ServiceResult<Option<Order>> {
        let data = self.inner.lock();
        let mut matching: Vec<Order> = data
            .orders
            .values()
            .filter(|o| {
                o.merchant_id == merchant_id && o.session_id == session_id && o.status.is_active()
            })
            .cloned()
            .collect();
        MemoryData::newest_first(&mut matching);
        Ok(matching.into_iter().next())
    }

    async fn list_merchant_orders(&self, merchant_id: i64) -> ServiceResult<Vec<Order>> {
        let data = self.inner.lock();
        let mut orders: Vec<Order> = data
            .orders
            .values()
            .filter(|o| o.merchant_id == merchant_id)
            .cloned()
            .collect();
        MemoryData::newest_first(&mut orders);
        Ok(orders)
    }

    async fn transition(
        &self,
        id: i64,
        from: &[OrderStatus],
        change: StatusChange,
    ) -> ServiceResult<TransitionOutcome> {
        let mut data = self.inner.lock();
        let Some(order) = data.orders.get_mut(&id) else {
            return Ok(TransitionOutcome::Missing);
        };
        if !from.contains(&order.status) {
            return Ok(TransitionOutcome::Rejected(order.status));
        }

        order.status = change.to;
        if let Some(assignee) = change.assignee {
            order.assignee = Some(assignee);
        }
        if let Some(claim) = change.claim {
            order.claim_code = Some(claim.claim_code);
            order.qr_code_data = Some(claim.qr_code_data);
        }
        order.updated_at = Utc::now();
        Ok(TransitionOutcome::Applied(Box::new(order.clone())))
    }
}

#[async_trait]
impl MenuRepository for MemoryStore {
    async fn find_items_for_merchant(
        &self,
        merchant_id: i64,
        ids: &[i64],
    ) -> ServiceResult<Vec<MenuItem>> {
        let data = self.inner.lock();
        Ok(ids
            .iter()
            .filter_map(|id| data.menu_items.get(id))
            .filter(|item| item.merchant_id == merchant_id)
            .cloned()
            .collect())
    }

    async fn list_menu(
        &self,
        merchant_id: i64,
        available_only: bool,
    ) -> ServiceResult<Vec<MenuItem>> {
        let data = self.inner.lock();
        Ok(data
            .menu_items
            .values()
            .filter(|item| item.merchant_id == merchant_id)
            .filter(|item| !available_only || item.is_available)
            .cloned()
            .collect())
    }

    async fn create_menu_item(&self, data: &MenuItemCreate) -> ServiceResult<MenuItem> {
        Ok(self.insert_menu_item(data))
    }

    async fn update_menu_item(
        &self,
        id: i64,
        update: &MenuItemUpdate,
    ) -> ServiceResult<Option<MenuItem>> {
        let mut guard = self.inner.lock();
        let data = &mut *guard;
        if !data.menu_items.contains_key(&id) {
            return Ok(None);
        }
        let specifications = update
            .specifications
            .as_deref()
            .map(|input| data.build_specifications(input));

        let Some(item) = data.menu_items.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &update.name {
            item.name = name.clone();
        }
        if let Some(price) = update.price {
            item.price = price;
        }
        if let Some(original_price) = update.original_price {
            item.original_price = Some(original_price);
        }
        if let Some(description) = &update.description {
            item.description = Some(description.clone());
        }
        if let Some(image_url) = &update.image_url {
            item.image_url = Some(image_url.clone());
        }
        if let Some(is_available) = update.is_available {
            item.is_available = is_available;
        }
        if let Some(specifications) = specifications {
            item.specifications = specifications;
        }
        Ok(Some(item.clone()))
    }

    async fn delete_menu_item(&self, id: i64) -> ServiceResult<bool> {
        let mut data = self.inner.lock();
        if !data.menu_items.contains_key(&id) {
            return Ok(false);
        }
        let referenced = data
            .orders
            .values()
            .flat_map(|o| o.items.iter())
            .any(|item| item.menu_item_id == id);
        if referenced {
            return Err(ServiceError::app(
                ErrorCode::MenuItemInUse,
                format!("Menu item {id} is referenced by existing orders"),
            ));
        }
        data.menu_items.remove(&id);
        Ok(true)
    }

    async fn merchant_exists(&self, merchant_id: i64) -> ServiceResult<bool> {
        Ok(self.inner.lock().merchants.contains_key(&merchant_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewOrderItem;
    use crate::orders::specs::SelectionMap;

    fn new_order(merchant_id: i64, session: &str, menu_item_id: i64) -> NewOrder {
        NewOrder {
            merchant_id,
            session_id: session.into(),
            store_name: "Wudaokou".into(),
            store_address: "1 Chengfu Rd".into(),
            total_price: Decimal::from(26),
            status: OrderStatus::Received,
            items: vec![NewOrderItem {
                menu_item_id,
                quantity: 1,
                selected_specifications: SelectionMap::new(),
            }],
        }
    }

    #[tokio::test]
    async fn demo_seed_hides_unavailable_items() {
        let store = MemoryStore::with_demo_data();
        assert!(store.merchant_exists(1).await.unwrap());
        let all = store.list_menu(1, false).await.unwrap();
        let available = store.list_menu(1, true).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(available.len(), 2);
        assert!(available.iter().all(|i| i.is_available));
    }

    #[tokio::test]
    async fn second_active_order_for_session_is_rejected() {
        let store = MemoryStore::with_demo_data();
        store.insert_order(new_order(1, "s1", 1)).await.unwrap();
        let err = store.insert_order(new_order(1, "s1", 1)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ActiveOrderExists);

        // Other sessions are unaffected
        store.insert_order(new_order(1, "s2", 1)).await.unwrap();
    }

    #[tokio::test]
    async fn transition_is_compare_and_set() {
        let store = MemoryStore::with_demo_data();
        let order = store.insert_order(new_order(1, "s1", 1)).await.unwrap();

        let outcome = store
            .transition(order.id, &[OrderStatus::Received], StatusChange::to(OrderStatus::Preparing))
            .await
            .unwrap();
        assert!(matches!(outcome, TransitionOutcome::Applied(o) if o.status == OrderStatus::Preparing));

        let outcome = store
            .transition(order.id, &[OrderStatus::Received], StatusChange::to(OrderStatus::Preparing))
            .await
            .unwrap();
        assert!(matches!(outcome, TransitionOutcome::Rejected(OrderStatus::Preparing)));

        let outcome = store
            .transition(999, &[OrderStatus::Received], StatusChange::to(OrderStatus::Preparing))
            .await
            .unwrap();
        assert!(matches!(outcome, TransitionOutcome::Missing));
    }

    #[tokio::test]
    async fn referenced_menu_item_cannot_be_deleted() {
        let store = MemoryStore::with_demo_data();
        store.insert_order(new_order(1, "s1", 1)).await.unwrap();

        let err = store.delete_menu_item(1).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::MenuItemInUse);
        assert!(store.delete_menu_item(2).await.unwrap());
        assert!(!store.delete_menu_item(2).await.unwrap());
    }

    #[tokio::test]
    async fn update_replaces_specifications() {
        let store = MemoryStore::with_demo_data();
        let update = MenuItemUpdate {
            price: Some(Decimal::from(28)),
            specifications: Some(vec![SpecificationInput {
                name: "sweetness".into(),
                options: vec![SpecOptionInput {
                    name: "half".into(),
                    price_change: Decimal::ZERO,
                }],
            }]),
            ..Default::default()
        };
        let item = store.update_menu_item(1, &update).await.unwrap().unwrap();
        assert_eq!(item.price, Decimal::from(28));
        assert_eq!(item.name, "Latte");
        assert_eq!(item.specifications.len(), 1);
        assert_eq!(item.specifications[0].name, "sweetness");

        assert!(store.update_menu_item(999, &update).await.unwrap().is_none());
    }
}
