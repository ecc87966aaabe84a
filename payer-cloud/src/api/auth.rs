//! Customer session tokens
//!
//! POST /api/auth/token  → issue a token for a merchant + session (or table)
//! GET  /api/auth/profile → echo the identity and the session's active order

use axum::Extension;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use shared::error::{ApiResponse, AppError, ErrorCode};

use super::ApiResult;
use super::extract::ValidatedJson;
use crate::auth::{CustomerIdentity, customer_auth};
use crate::orders::SessionKey;
use crate::state::AppState;

#[derive(Debug, Deserialize, validator::Validate)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub merchant_id: i64,
    #[validate(length(min = 1, max = 128))]
    pub session_id: Option<String>,
    pub table_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub merchant_id: i64,
    pub session_id: String,
    #[serde(rename = "type")]
    pub token_type: &'static str,
    pub active_order_id: Option<i64>,
}

/// Session precedence: explicit session id, then table link, then a fresh one
fn session_for(req: &TokenRequest) -> SessionKey {
    match (&req.session_id, req.table_id) {
        (Some(session), _) => SessionKey::new(session.clone()),
        (None, Some(table)) => SessionKey::from_table(table),
        (None, None) => SessionKey::generate(),
    }
}

/// POST /api/auth/token
pub async fn issue_token(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<TokenRequest>,
) -> ApiResult<TokenResponse> {
    if !state.menu.merchant_exists(req.merchant_id).await? {
        return Err(AppError::with_message(
            ErrorCode::MerchantNotFound,
            format!("Merchant {} not found", req.merchant_id),
        )
        .into());
    }

    let session = session_for(&req);
    let access_token = customer_auth::create_token(
        req.merchant_id,
        &session,
        &state.jwt_secret,
        state.jwt_expiry_hours,
    )
    .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))?;

    tracing::info!(merchant_id = req.merchant_id, session_id = %session, "Customer token issued");
    Ok(ApiResponse::success(TokenResponse {
        access_token,
        session_id: session.as_str().to_string(),
    }))
}

/// GET /api/auth/profile
pub async fn profile(
    State(state): State<AppState>,
    Extension(identity): Extension<CustomerIdentity>,
) -> ApiResult<ProfileResponse> {
    let active = state
        .orders
        .find_active_order(identity.merchant_id, &identity.session)
        .await?;
    Ok(ApiResponse::success(ProfileResponse {
        merchant_id: identity.merchant_id,
        session_id: identity.session.as_str().to_string(),
        token_type: "customer",
        active_order_id: active.map(|o| o.id),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(session_id: Option<&str>, table_id: Option<i64>) -> TokenRequest {
        TokenRequest {
            merchant_id: 1,
            session_id: session_id.map(String::from),
            table_id,
        }
    }

    #[test]
    fn explicit_session_wins_over_table() {
        assert_eq!(session_for(&request(Some("s-1"), Some(4))).as_str(), "s-1");
        assert_eq!(
            session_for(&request(None, Some(4))).as_str(),
            SessionKey::from_table(4).as_str()
        );
    }

    #[test]
    fn fresh_sessions_are_distinct() {
        let a = session_for(&request(None, None));
        let b = session_for(&request(None, None));
        assert_ne!(a.as_str(), b.as_str());
    }
}
