//! Order Models
//!
//! Wire shapes for customer orders, their items and the pickup credential.
//! Field names are camelCase on the wire; status values are the persisted
//! SCREAMING_SNAKE_CASE strings.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use super::menu::MenuItemSummary;

/// Order status
///
/// `RECEIVED → PREPARING → COMPLETED` is the main path. `AWAITING_PAYMENT`
/// precedes `RECEIVED` when the payment gate is enabled, `CANCELLED` is
/// reachable from every non-terminal status. `SERVED` is accepted on the wire
/// for older clients but no transition produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    AwaitingPayment,
    Received,
    Preparing,
    Served,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Statuses that occupy a session's single active-order slot
    pub const ACTIVE: [OrderStatus; 3] = [
        OrderStatus::AwaitingPayment,
        OrderStatus::Received,
        OrderStatus::Preparing,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::AwaitingPayment => "AWAITING_PAYMENT",
            OrderStatus::Received => "RECEIVED",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Served => "SERVED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a persisted status string is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownOrderStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownOrderStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AWAITING_PAYMENT" => Ok(OrderStatus::AwaitingPayment),
            "RECEIVED" => Ok(OrderStatus::Received),
            "PREPARING" => Ok(OrderStatus::Preparing),
            "SERVED" => Ok(OrderStatus::Served),
            "COMPLETED" => Ok(OrderStatus::Completed),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(UnknownOrderStatus(other.to_string())),
        }
    }
}

/// Staff member who claimed an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Assignee {
    pub id: i64,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// The option chosen for one specification, echoed back as submitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedOption {
    /// Client-side option identifier, opaque to the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_change: Option<Decimal>,
}

/// One `{name, option}` pair of an order item's selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SelectedSpecification {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub option: SelectedOption,
}

/// Order line as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub menu_item_id: i64,
    pub quantity: i32,
    pub selected_specifications: Vec<SelectedSpecification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_item: Option<MenuItemSummary>,
}

/// Order as returned to clients and pushed over the realtime channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub merchant_id: i64,
    pub session_id: String,
    pub store_name: String,
    pub store_address: String,
    pub total_price: Decimal,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Assignee>,
    pub claim_code: Option<String>,
    pub qr_code_data: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Pickup credential, present once the order is completed
    pub fn claim_details(&self) -> Option<ClaimDetails> {
        match (&self.claim_code, &self.qr_code_data) {
            (Some(code), Some(qr)) => Some(ClaimDetails {
                claim_code: code.clone(),
                qr_code_data: qr.clone(),
            }),
            _ => None,
        }
    }
}

/// Opaque pickup credential attached at completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ClaimDetails {
    #[validate(length(min = 1, max = 64))]
    pub claim_code: String,
    #[validate(length(min = 1))]
    pub qr_code_data: String,
}

// ── Request payloads ──

/// One line of a create-order request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderItemRequest {
    pub menu_item_id: i64,
    #[validate(range(min = 1, max = 999))]
    pub quantity: i32,
    #[validate(nested)]
    #[serde(default)]
    pub selected_specifications: Option<Vec<SelectedSpecification>>,
}

/// Create-order request body
///
/// Merchant and session come from the caller's token. Table-link clients
/// without a token send `merchantId` and `tableId` in the body instead.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<i64>,
    #[validate(length(min = 1, max = 200))]
    pub store_name: String,
    #[validate(length(min = 1, max = 500))]
    pub store_address: String,
    #[validate(length(min = 1, max = 100), nested)]
    pub items: Vec<CreateOrderItemRequest>,
}

/// Claim-order request body
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ClaimOrderRequest {
    #[validate(nested)]
    pub assignee: Assignee,
}
