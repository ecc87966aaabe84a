//! Customer order endpoints
//!
//! Every lookup is scoped to the caller's merchant + session, so a token for
//! one session cannot read another session's orders.

use axum::Extension;
use axum::extract::{Path, State};
use shared::error::{ApiResponse, AppError};
use shared::models::{ClaimDetails, CreateOrderRequest, Order};

use super::ApiResult;
use super::extract::ValidatedJson;
use crate::auth::CustomerIdentity;
use crate::orders::{CreateOrderCommand, SessionKey};
use crate::state::AppState;

/// Merchant and session for a new order: the token when present, otherwise
/// the legacy table-link body fields.
fn order_scope(
    identity: Option<CustomerIdentity>,
    req: &CreateOrderRequest,
) -> Result<(i64, SessionKey), AppError> {
    if let Some(identity) = identity {
        return Ok((identity.merchant_id, identity.session));
    }
    match (req.merchant_id, req.table_id) {
        (Some(merchant_id), Some(table_id)) => Ok((merchant_id, SessionKey::from_table(table_id))),
        _ => Err(AppError::not_authenticated()),
    }
}

/// POST /api/orders
pub async fn create_order(
    State(state): State<AppState>,
    identity: Option<Extension<CustomerIdentity>>,
    ValidatedJson(req): ValidatedJson<CreateOrderRequest>,
) -> ApiResult<Order> {
    let (merchant_id, session) = order_scope(identity.map(|Extension(i)| i), &req)?;
    let cmd = CreateOrderCommand::from_request(merchant_id, session, req);
    let order = state.orders.create_order(cmd).await?;
    Ok(ApiResponse::success(order))
}

/// GET /api/orders/active/session
///
/// `data` is `null` when the session has nothing in progress.
pub async fn active_order(
    State(state): State<AppState>,
    Extension(identity): Extension<CustomerIdentity>,
) -> ApiResult<Order> {
    let order = state
        .orders
        .find_active_order(identity.merchant_id, &identity.session)
        .await?;
    Ok(ApiResponse::maybe(order))
}

/// GET /api/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Extension(identity): Extension<CustomerIdentity>,
    Path(id): Path<i64>,
) -> ApiResult<Order> {
    let order = state
        .orders
        .get_order(id, identity.merchant_id, &identity.session)
        .await?;
    Ok(ApiResponse::success(order))
}

/// POST /api/orders/{id}/pay
pub async fn pay_order(
    State(state): State<AppState>,
    Extension(identity): Extension<CustomerIdentity>,
    Path(id): Path<i64>,
) -> ApiResult<Order> {
    let order = state
        .orders
        .confirm_payment(id, identity.merchant_id, &identity.session)
        .await?;
    Ok(ApiResponse::success(order))
}

/// GET /api/orders/{id}/claim-details
pub async fn claim_details(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ClaimDetails> {
    let details = state.orders.get_claim_details(id).await?;
    Ok(ApiResponse::success(details))
}
