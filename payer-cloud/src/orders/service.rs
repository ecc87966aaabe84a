//! Order lifecycle service
//!
//! The single writer of order state. Every status change is a conditional
//! update in the repository, so two concurrent claims of the same order
//! produce exactly one success.

use chrono::Utc;
use shared::error::{AppError, ErrorCode};
use shared::models::{Assignee, ClaimDetails, MenuItem, Order, OrderStatus};
use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;

use super::claim::{ClaimCodeGenerator, ClaimSource, DigestClaimCodes};
use super::specs::{self, SelectionMap};
use super::{CreateOrderCommand, SessionKey, pricing};
use crate::db::{
    MenuRepository, NewOrder, NewOrderItem, OrderRepository, StatusChange, TransitionOutcome,
};
use crate::error::{ServiceError, ServiceResult};
use crate::live::Notifier;

/// Maximum quantity of a single order line
const MAX_QUANTITY: i32 = 999;

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    menu: Arc<dyn MenuRepository>,
    notifier: Notifier,
    claims: Arc<dyn ClaimCodeGenerator>,
    require_payment: bool,
}

fn order_not_found(id: i64) -> ServiceError {
    ServiceError::app(ErrorCode::OrderNotFound, format!("Order {id} not found"))
}

fn describe(statuses: &[OrderStatus]) -> String {
    statuses
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(" or ")
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        menu: Arc<dyn MenuRepository>,
        notifier: Notifier,
    ) -> Self {
        Self {
            orders,
            menu,
            notifier,
            claims: Arc::new(DigestClaimCodes),
            require_payment: false,
        }
    }

    pub fn with_claim_generator(mut self, claims: Arc<dyn ClaimCodeGenerator>) -> Self {
        self.claims = claims;
        self
    }

    /// New orders start in `AWAITING_PAYMENT` and reach the merchant only once paid
    pub fn with_payment_gate(mut self, require_payment: bool) -> Self {
        self.require_payment = require_payment;
        self
    }

    // ── Customer operations ──

    pub async fn create_order(&self, cmd: CreateOrderCommand) -> ServiceResult<Order> {
        if cmd.lines.is_empty() {
            return Err(AppError::new(ErrorCode::OrderEmpty).into());
        }

        let mut selections: Vec<SelectionMap> = Vec::with_capacity(cmd.lines.len());
        for line in &cmd.lines {
            if line.quantity < 1 || line.quantity > MAX_QUANTITY {
                return Err(AppError::with_message(
                    ErrorCode::ValueOutOfRange,
                    format!("quantity must be between 1 and {MAX_QUANTITY}, got {}", line.quantity),
                )
                .with_detail("menuItemId", line.menu_item_id)
                .into());
            }
            selections.push(specs::normalize(line.selected_specifications.as_deref())?);
        }

        let mut ids: Vec<i64> = cmd.lines.iter().map(|l| l.menu_item_id).collect();
        ids.sort_unstable();
        ids.dedup();

        let menu: HashMap<i64, MenuItem> = self
            .menu
            .find_items_for_merchant(cmd.merchant_id, &ids)
            .await?
            .into_iter()
            .filter(|item| item.is_available)
            .map(|item| (item.id, item))
            .collect();

        if let Some(missing) = ids.iter().find(|id| !menu.contains_key(id)) {
            tracing::debug!(
                merchant_id = cmd.merchant_id,
                menu_item_id = missing,
                "Order rejected: menu item unavailable"
            );
            return Err(AppError::with_message(
                ErrorCode::MenuItemNotFound,
                format!("Menu item {missing} does not exist for merchant {}", cmd.merchant_id),
            )
            .with_detail("menuItemId", *missing)
            .into());
        }

        if let Some(active) = self
            .orders
            .find_active_order(cmd.merchant_id, cmd.session.as_str())
            .await?
        {
            return Err(AppError::new(ErrorCode::ActiveOrderExists)
                .with_detail("activeOrderId", active.id)
                .into());
        }

        let total_price = pricing::order_total(
            cmd.lines
                .iter()
                .zip(&selections)
                .filter_map(|(line, sel)| menu.get(&line.menu_item_id).map(|m| (m, line.quantity, sel))),
        );

        let status = if self.require_payment {
            OrderStatus::AwaitingPayment
        } else {
            OrderStatus::Received
        };

        let items = cmd
            .lines
            .iter()
            .zip(selections)
            .map(|(line, selected_specifications)| NewOrderItem {
                menu_item_id: line.menu_item_id,
                quantity: line.quantity,
                selected_specifications,
            })
            .collect();

        let order = self
            .orders
            .insert_order(NewOrder {
                merchant_id: cmd.merchant_id,
                session_id: cmd.session.as_str().to_string(),
                store_name: cmd.store_name,
                store_address: cmd.store_address,
                total_price,
                status,
                items,
            })
            .await?;

        tracing::info!(
            order_id = order.id,
            merchant_id = order.merchant_id,
            total_price = %order.total_price,
            status = %order.status,
            "Order created"
        );

        if order.status == OrderStatus::Received {
            self.notifier.notify_new_order(&order).await;
        }
        Ok(order)
    }

    /// Newest order of the session that is still in progress
    pub async fn find_active_order(
        &self,
        merchant_id: i64,
        session: &SessionKey,
    ) -> ServiceResult<Option<Order>> {
        self.orders
            .find_active_order(merchant_id, session.as_str())
            .await
    }

    /// Order `id` only if it belongs to the caller's session
    pub async fn get_order(
        &self,
        id: i64,
        merchant_id: i64,
        session: &SessionKey,
    ) -> ServiceResult<Order> {
        self.orders
            .find_order_for_session(id, merchant_id, session.as_str())
            .await?
            .ok_or_else(|| order_not_found(id))
    }

    pub async fn get_claim_details(&self, id: i64) -> ServiceResult<ClaimDetails> {
        let order = self
            .orders
            .find_order(id)
            .await?
            .ok_or_else(|| order_not_found(id))?;
        order.claim_details().ok_or_else(|| {
            ServiceError::app(
                ErrorCode::ClaimDetailsNotFound,
                format!("Claim details for order {id} are not available yet"),
            )
        })
    }

    /// AWAITING_PAYMENT → RECEIVED. Orders past payment are returned unchanged.
    pub async fn confirm_payment(
        &self,
        id: i64,
        merchant_id: i64,
        session: &SessionKey,
    ) -> ServiceResult<Order> {
        let order = self.get_order(id, merchant_id, session).await?;
        if order.status != OrderStatus::AwaitingPayment {
            return Ok(order);
        }

        match self
            .orders
            .transition(
                id,
                &[OrderStatus::AwaitingPayment],
                StatusChange::to(OrderStatus::Received),
            )
            .await?
        {
            TransitionOutcome::Applied(order) => {
                tracing::info!(order_id = id, merchant_id, "Order paid");
                self.notifier.notify_new_order(&order).await;
                Ok(*order)
            }
            // Paid concurrently; report the current state
            TransitionOutcome::Rejected(_) => self.get_order(id, merchant_id, session).await,
            TransitionOutcome::Missing => Err(order_not_found(id)),
        }
    }

    // ── Merchant operations ──

    /// All orders of a merchant, newest first
    pub async fn list_merchant_orders(&self, merchant_id: i64) -> ServiceResult<Vec<Order>> {
        self.orders.list_merchant_orders(merchant_id).await
    }

    /// RECEIVED → PREPARING, recording who took the order
    pub async fn claim_order(&self, id: i64, assignee: Assignee) -> ServiceResult<Order> {
        assignee.validate().map_err(AppError::from)?;
        let change = StatusChange {
            to: OrderStatus::Preparing,
            assignee: Some(assignee),
            claim: None,
        };
        let order = self
            .apply(id, &[OrderStatus::Received], change, "claim")
            .await?;
        self.notifier.notify_status_changed(&order).await;
        Ok(order)
    }

    /// PREPARING → COMPLETED, attaching the pickup credential
    pub async fn complete_order(&self, id: i64, source: ClaimSource) -> ServiceResult<Order> {
        let claim = match source {
            ClaimSource::Supplied(details) => {
                details.validate().map_err(AppError::from)?;
                details
            }
            ClaimSource::Generated => self.claims.generate(id, Utc::now()),
        };
        let change = StatusChange {
            to: OrderStatus::Completed,
            assignee: None,
            claim: Some(claim.clone()),
        };
        let order = self
            .apply(id, &[OrderStatus::Preparing], change, "complete")
            .await?;
        self.notifier.notify_status_changed(&order).await;
        self.notifier.notify_qr_code_ready(order.id, &claim).await;
        Ok(order)
    }

    /// Any in-progress status → CANCELLED
    pub async fn cancel_order(&self, id: i64) -> ServiceResult<Order> {
        let order = self
            .apply(
                id,
                &OrderStatus::ACTIVE,
                StatusChange::to(OrderStatus::Cancelled),
                "cancel",
            )
            .await?;
        self.notifier.notify_status_changed(&order).await;
        Ok(order)
    }

    async fn apply(
        &self,
        id: i64,
        from: &[OrderStatus],
        change: StatusChange,
        action: &str,
    ) -> ServiceResult<Order> {
        let to = change.to;
        match self.orders.transition(id, from, change).await? {
            TransitionOutcome::Applied(order) => {
                tracing::info!(
                    order_id = id,
                    merchant_id = order.merchant_id,
                    status = %to,
                    action,
                    "Order status changed"
                );
                Ok(*order)
            }
            TransitionOutcome::Missing => Err(order_not_found(id)),
            TransitionOutcome::Rejected(current) => {
                tracing::debug!(order_id = id, current = %current, action, "Transition rejected");
                let code = if current == OrderStatus::Completed {
                    ErrorCode::OrderAlreadyCompleted
                } else {
                    ErrorCode::OrderStatusConflict
                };
                Err(AppError::with_message(
                    code,
                    format!(
                        "Cannot {action} order {id}: status is {current}, expected {}",
                        describe(from)
                    ),
                )
                .with_detail("status", current.as_str())
                .into())
            }
        }
    }
}
