//! Store search proxy

use axum::extract::{Query, State};
use serde::Deserialize;
use shared::error::{ApiResponse, AppError};

use super::ApiResult;
use crate::state::AppState;
use crate::stores::StoreLocation;

#[derive(Debug, Deserialize)]
pub struct StoreSearchQuery {
    pub city: Option<String>,
    pub keywords: Option<String>,
}

/// GET /api/stores/search?city=&keywords=
pub async fn search_stores(
    State(state): State<AppState>,
    Query(query): Query<StoreSearchQuery>,
) -> ApiResult<Vec<StoreLocation>> {
    let city = query
        .city
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::validation("city is required").with_detail("field", "city"))?;
    let stores = state
        .store_search
        .search(city, query.keywords.as_deref())
        .await?;
    Ok(ApiResponse::success(stores))
}
