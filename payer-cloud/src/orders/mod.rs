//! Order lifecycle
//!
//! ```text
//! [AWAITING_PAYMENT] --pay--> RECEIVED --claim--> PREPARING --complete--> COMPLETED
//!          └──────────────────────┴────────cancel──────┴──────────────────> CANCELLED
//! ```
//!
//! `AWAITING_PAYMENT` is only used when the payment gate is enabled.

pub mod claim;
pub mod pricing;
pub mod service;
pub mod specs;

pub use claim::{ClaimCodeGenerator, ClaimSource, DigestClaimCodes};
pub use service::OrderService;

use shared::models::{CreateOrderRequest, SelectedSpecification};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier of the customer's ordering session
///
/// A table link uses the table id; one-time links get a random UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn from_table(table_id: i64) -> Self {
        Self(table_id.to_string())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One requested line of a new order
#[derive(Debug, Clone)]
pub struct OrderLine {
    pub menu_item_id: i64,
    pub quantity: i32,
    pub selected_specifications: Option<Vec<SelectedSpecification>>,
}

/// Everything the lifecycle needs to create an order, already scoped to a
/// merchant and session by the caller
#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    pub merchant_id: i64,
    pub session: SessionKey,
    pub store_name: String,
    pub store_address: String,
    pub lines: Vec<OrderLine>,
}

impl CreateOrderCommand {
    pub fn from_request(merchant_id: i64, session: SessionKey, req: CreateOrderRequest) -> Self {
        Self {
            merchant_id,
            session,
            store_name: req.store_name,
            store_address: req.store_address,
            lines: req
                .items
                .into_iter()
                .map(|item| OrderLine {
                    menu_item_id: item.menu_item_id,
                    quantity: item.quantity,
                    selected_specifications: item.selected_specifications,
                })
                .collect(),
        }
    }
}
