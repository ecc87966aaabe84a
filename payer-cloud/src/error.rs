//! Unified service-layer error type
//!
//! `ServiceError` bridges storage errors (`sqlx::Error`, `BoxError`) and the
//! API-layer error (`AppError`), so repository and service code can propagate
//! with `?` and handlers can return it directly.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// PostgreSQL SQLSTATE for unique_violation
const PG_UNIQUE_VIOLATION: &str = "23505";
/// PostgreSQL SQLSTATE for foreign_key_violation
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";
/// Partial unique index over a session's active orders
const ACTIVE_ORDER_INDEX: &str = "uq_orders_active_session";

/// Service-layer error with two variants.
///
/// - `Db`: storage/infrastructure errors (logged, mapped to InternalError)
/// - `App`: business-rule errors (passed through to the client)
#[derive(Debug)]
pub enum ServiceError {
    /// Database or infrastructure error (sqlx, serde, etc.)
    Db(BoxError),
    /// Business-rule error (already an AppError with the correct ErrorCode)
    App(AppError),
}

impl ServiceError {
    pub fn app(code: ErrorCode, message: impl Into<String>) -> Self {
        ServiceError::App(AppError::with_message(code, message))
    }

    /// Error code the client will see
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::App(e) => e.code,
            ServiceError::Db(_) => ErrorCode::InternalError,
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e
            && db.code().as_deref() == Some(PG_UNIQUE_VIOLATION)
            && db.constraint() == Some(ACTIVE_ORDER_INDEX)
        {
            return ServiceError::App(AppError::new(ErrorCode::ActiveOrderExists));
        }
        ServiceError::Db(e.into())
    }
}

/// Whether a statement failed on a foreign key (e.g. deleting a referenced row)
pub fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some(PG_FOREIGN_KEY_VIOLATION))
}

impl From<BoxError> for ServiceError {
    fn from(e: BoxError) -> Self {
        ServiceError::Db(e)
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::Db(e.into())
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Convenience type alias for service-layer results
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn db_errors_become_internal() {
        let err = ServiceError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.code(), ErrorCode::InternalError);
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn app_errors_pass_through() {
        let err = ServiceError::app(ErrorCode::OrderStatusConflict, "Order is COMPLETED");
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::OrderStatusConflict);
        assert_eq!(app.message, "Order is COMPLETED");
    }
}
