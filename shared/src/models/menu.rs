//! Menu Models
//!
//! Prices are `Decimal` in the currency's major unit (e.g. `26.50`) and
//! travel as JSON numbers (`serde-float`).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Menu item entity with its specifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: i64,
    pub merchant_id: i64,
    pub name: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_available: bool,
    #[serde(default)]
    pub specifications: Vec<Specification>,
}

impl MenuItem {
    /// Find an option by specification name and option name
    pub fn find_option(&self, spec_name: &str, option_name: &str) -> Option<&SpecOption> {
        self.specifications
            .iter()
            .find(|s| s.name == spec_name)
            .and_then(|s| s.options.iter().find(|o| o.name == option_name))
    }

    pub fn summary(&self) -> MenuItemSummary {
        MenuItemSummary {
            id: self.id,
            name: self.name.clone(),
            price: self.price,
            image_url: self.image_url.clone(),
        }
    }
}

/// A named choice group on a menu item, e.g. "temperature"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specification {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub options: Vec<SpecOption>,
}

/// One choice inside a specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecOption {
    pub id: i64,
    pub name: String,
    /// Signed delta applied to the item's base price
    pub price_change: Decimal,
}

/// Compact menu item view embedded in order items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemSummary {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    pub image_url: Option<String>,
}

/// Customer-facing menu section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuCategory {
    pub name: String,
    pub items: Vec<MenuItem>,
}

/// Option payload for create/update
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SpecOptionInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Accepts the back office's `price` field as well
    #[serde(alias = "price", default)]
    pub price_change: Decimal,
}

/// Specification payload for create/update
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SpecificationInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(nested)]
    #[serde(default)]
    pub options: Vec<SpecOptionInput>,
}

/// Create menu item payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemCreate {
    pub merchant_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(custom(function = "validate_price"))]
    pub price: Decimal,
    #[validate(custom(function = "validate_price"))]
    pub original_price: Option<Decimal>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_available: Option<bool>,
    #[validate(nested)]
    pub specifications: Option<Vec<SpecificationInput>>,
}

/// Update menu item payload
///
/// `specifications`, when present, replaces the item's specifications wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_price"))]
    pub price: Option<Decimal>,
    #[validate(custom(function = "validate_price"))]
    pub original_price: Option<Decimal>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_available: Option<bool>,
    #[validate(nested)]
    pub specifications: Option<Vec<SpecificationInput>>,
}

/// Maximum allowed price per item
const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() || *price > MAX_PRICE {
        return Err(ValidationError::new("price_out_of_range"));
    }
    Ok(())
}
