//! Customer JWT authentication
//!
//! A customer token binds the bearer to one merchant and one ordering
//! session. Order endpoints read the identity from request extensions.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::error::AppError;

use crate::orders::SessionKey;
use crate::state::AppState;

const TOKEN_TYPE: &str = "customer";

/// JWT claims for customer sessions
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerClaims {
    pub merchant_id: i64,
    pub session_id: String,
    #[serde(rename = "type")]
    pub token_type: String,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
}

/// Authenticated customer extracted from the JWT
#[derive(Debug, Clone)]
pub struct CustomerIdentity {
    pub merchant_id: i64,
    pub session: SessionKey,
}

/// Create a customer token
pub fn create_token(
    merchant_id: i64,
    session: &SessionKey,
    secret: &str,
    expiry_hours: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = CustomerClaims {
        merchant_id,
        session_id: session.as_str().to_string(),
        token_type: TOKEN_TYPE.to_string(),
        exp: (now + chrono::Duration::hours(expiry_hours)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify a customer token and map failures to auth errors
pub fn verify_token(token: &str, secret: &str) -> Result<CustomerIdentity, AppError> {
    let data = jsonwebtoken::decode::<CustomerClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        match e.kind() {
            ErrorKind::ExpiredSignature => AppError::token_expired(),
            _ => AppError::invalid_token("Invalid token"),
        }
    })?;

    if data.claims.token_type != TOKEN_TYPE {
        return Err(AppError::invalid_token("Not a customer token"));
    }

    Ok(CustomerIdentity {
        merchant_id: data.claims.merchant_id,
        session: SessionKey::new(data.claims.session_id),
    })
}

/// `Some(token)` when an Authorization header is present
fn bearer_token(request: &Request) -> Option<Result<&str, AppError>> {
    let header = request.headers().get(http::header::AUTHORIZATION)?;
    Some(
        header
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::invalid_token("Invalid Authorization format")),
    )
}

/// Middleware that requires a valid customer token
pub async fn customer_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request).ok_or_else(AppError::not_authenticated)??;
    let identity = verify_token(token, &state.jwt_secret)?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Middleware for routes that also serve token-less table links: a present
/// token must be valid, an absent one is left to the handler.
pub async fn optional_customer_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(token) = bearer_token(&request) {
        let identity = verify_token(token?, &state.jwt_secret)?;
        request.extensions_mut().insert(identity);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;

    const SECRET: &str = "test-secret";

    #[test]
    fn token_round_trip() {
        let session = SessionKey::new("abc");
        let token = create_token(7, &session, SECRET, 24).unwrap();
        let identity = verify_token(&token, SECRET).unwrap();
        assert_eq!(identity.merchant_id, 7);
        assert_eq!(identity.session, session);
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = create_token(7, &SessionKey::new("abc"), SECRET, 24).unwrap();
        let err = verify_token(&token, "other").unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenInvalid);
    }

    #[test]
    fn expired_token_is_reported() {
        let token = create_token(7, &SessionKey::new("abc"), SECRET, -2).unwrap();
        let err = verify_token(&token, SECRET).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenExpired);
    }

    #[test]
    fn claims_use_wire_names() {
        let token = create_token(7, &SessionKey::new("abc"), SECRET, 1).unwrap();
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        let data = jsonwebtoken::decode::<serde_json::Value>(
            &token,
            &DecodingKey::from_secret(&[]),
            &validation,
        )
        .unwrap();
        assert_eq!(data.claims["merchantId"], 7);
        assert_eq!(data.claims["sessionId"], "abc");
        assert_eq!(data.claims["type"], "customer");
    }
}
