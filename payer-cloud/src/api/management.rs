//! Back-office order endpoints

use axum::extract::{Path, State};
use shared::error::ApiResponse;
use shared::models::{ClaimDetails, ClaimOrderRequest, Order};

use super::ApiResult;
use super::extract::ValidatedJson;
use crate::orders::ClaimSource;
use crate::state::AppState;

/// GET /api/management/orders/merchant/{merchant_id}
pub async fn list_merchant_orders(
    State(state): State<AppState>,
    Path(merchant_id): Path<i64>,
) -> ApiResult<Vec<Order>> {
    let orders = state.orders.list_merchant_orders(merchant_id).await?;
    Ok(ApiResponse::success(orders))
}

/// POST /api/management/orders/{order_id}/claim
pub async fn claim_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<ClaimOrderRequest>,
) -> ApiResult<Order> {
    let order = state.orders.claim_order(order_id, req.assignee).await?;
    Ok(ApiResponse::success(order))
}

/// POST /api/management/orders/{order_id}/sync-qr
///
/// Completion with a credential produced by the store's own terminal.
pub async fn sync_qr(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    ValidatedJson(details): ValidatedJson<ClaimDetails>,
) -> ApiResult<Order> {
    let order = state
        .orders
        .complete_order(order_id, ClaimSource::Supplied(details))
        .await?;
    Ok(ApiResponse::success(order))
}

/// POST /api/management/orders/{order_id}/complete
pub async fn complete_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> ApiResult<Order> {
    let order = state
        .orders
        .complete_order(order_id, ClaimSource::Generated)
        .await?;
    Ok(ApiResponse::success(order))
}

/// POST /api/management/orders/{order_id}/cancel
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> ApiResult<Order> {
    let order = state.orders.cancel_order(order_id).await?;
    Ok(ApiResponse::success(order))
}
