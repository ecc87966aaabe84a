//! Menu endpoints
//!
//! The customer menu only shows available items. Back-office CRUD sees
//! everything and replaces specifications wholesale on update.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use shared::error::{ApiResponse, AppError, ErrorCode};
use shared::models::{MenuCategory, MenuItem, MenuItemCreate, MenuItemUpdate};

use super::ApiResult;
use super::extract::ValidatedJson;
use crate::error::ServiceError;
use crate::state::AppState;

/// Name of the single category the customer menu is grouped under
const DEFAULT_CATEGORY: &str = "Menu";

fn menu_item_not_found(id: i64) -> ServiceError {
    ServiceError::app(ErrorCode::MenuItemNotFound, format!("Menu item {id} not found"))
}

async fn ensure_merchant(state: &AppState, merchant_id: i64) -> Result<(), ServiceError> {
    if state.menu.merchant_exists(merchant_id).await? {
        Ok(())
    } else {
        Err(AppError::with_message(
            ErrorCode::MerchantNotFound,
            format!("Merchant {merchant_id} not found"),
        )
        .into())
    }
}

/// GET /api/merchants/{merchant_id}/menu
pub async fn customer_menu(
    State(state): State<AppState>,
    Path(merchant_id): Path<i64>,
) -> ApiResult<Vec<MenuCategory>> {
    let items = state.menu.list_menu(merchant_id, true).await?;
    let categories = if items.is_empty() {
        Vec::new()
    } else {
        vec![MenuCategory {
            name: DEFAULT_CATEGORY.to_string(),
            items,
        }]
    };
    Ok(ApiResponse::success(categories))
}

/// GET /api/management/merchants/{merchant_id}/menu-items
pub async fn list_menu_items(
    State(state): State<AppState>,
    Path(merchant_id): Path<i64>,
) -> ApiResult<Vec<MenuItem>> {
    ensure_merchant(&state, merchant_id).await?;
    let items = state.menu.list_menu(merchant_id, false).await?;
    Ok(ApiResponse::success(items))
}

/// POST /api/management/merchants/menu-items
pub async fn create_menu_item(
    State(state): State<AppState>,
    ValidatedJson(data): ValidatedJson<MenuItemCreate>,
) -> ApiResult<MenuItem> {
    ensure_merchant(&state, data.merchant_id).await?;
    let item = state.menu.create_menu_item(&data).await?;
    tracing::info!(merchant_id = item.merchant_id, menu_item_id = item.id, "Menu item created");
    Ok(ApiResponse::success(item))
}

/// PUT /api/management/merchants/menu-items/{id}
pub async fn update_menu_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(data): ValidatedJson<MenuItemUpdate>,
) -> ApiResult<MenuItem> {
    let item = state
        .menu
        .update_menu_item(id, &data)
        .await?
        .ok_or_else(|| menu_item_not_found(id))?;
    tracing::info!(menu_item_id = id, "Menu item updated");
    Ok(ApiResponse::success(item))
}

/// DELETE /api/management/merchants/menu-items/{id}
pub async fn delete_menu_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    if !state.menu.delete_menu_item(id).await? {
        return Err(menu_item_not_found(id));
    }
    tracing::info!(menu_item_id = id, "Menu item deleted");
    Ok(StatusCode::NO_CONTENT)
}
