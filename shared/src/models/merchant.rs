//! Merchant Model

use serde::{Deserialize, Serialize};

/// A restaurant tenant owning menu items and orders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Merchant {
    pub id: i64,
    pub name: String,
}
