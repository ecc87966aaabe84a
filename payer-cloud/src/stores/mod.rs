//! Store search through the Amap place text API

use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use std::time::Duration;

use crate::config::Config;

/// Results per page requested from Amap
const PAGE_SIZE: u32 = 25;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A store as returned to the storefront
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreLocation {
    pub id: String,
    pub name: String,
    pub address: String,
    /// "lng,lat"
    pub location: String,
}

#[derive(Debug, Deserialize)]
struct AmapResponse {
    status: String,
    #[serde(default)]
    info: Option<String>,
    #[serde(default)]
    pois: Vec<AmapPoi>,
}

#[derive(Debug, Deserialize)]
struct AmapPoi {
    id: String,
    name: String,
    /// A string, or `[]` when Amap has no address
    #[serde(default)]
    address: serde_json::Value,
    #[serde(default)]
    location: String,
}

impl From<AmapPoi> for StoreLocation {
    fn from(poi: AmapPoi) -> Self {
        StoreLocation {
            id: poi.id,
            name: poi.name,
            address: poi.address.as_str().unwrap_or_default().to_string(),
            location: poi.location,
        }
    }
}

impl AmapResponse {
    fn into_stores(self) -> Result<Vec<StoreLocation>, AppError> {
        if self.status != "1" {
            let info = self.info.unwrap_or_else(|| "unknown error".into());
            return Err(AppError::with_message(
                ErrorCode::UpstreamError,
                format!("Store search failed: {info}"),
            )
            .with_detail("info", info));
        }
        Ok(self.pois.into_iter().map(StoreLocation::from).collect())
    }
}

/// Amap client
#[derive(Clone)]
pub struct StoreSearch {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    keyword: String,
}

impl StoreSearch {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_url: config.amap_api_url.clone(),
            api_key: config.amap_api_key.clone(),
            keyword: config.store_search_keyword.clone(),
        })
    }

    fn search_keywords(&self, keywords: Option<&str>) -> String {
        match keywords.map(str::trim).filter(|k| !k.is_empty()) {
            Some(extra) => format!("{} {extra}", self.keyword),
            None => self.keyword.clone(),
        }
    }

    /// Brand stores in `city`, optionally narrowed by extra keywords
    pub async fn search(
        &self,
        city: &str,
        keywords: Option<&str>,
    ) -> Result<Vec<StoreLocation>, AppError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(AppError::with_message(
                ErrorCode::ConfigError,
                "Store search is not configured (AMAP_API_KEY)",
            ));
        };
        let keywords = self.search_keywords(keywords);
        let offset = PAGE_SIZE.to_string();

        let response = self
            .http
            .get(&self.api_url)
            .query(&[
                ("key", key),
                ("keywords", keywords.as_str()),
                ("city", city),
                ("offset", offset.as_str()),
                ("page", "1"),
                ("extensions", "base"),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Store search request failed");
                AppError::with_message(ErrorCode::NetworkError, "Store search service unreachable")
            })?;

        let body: AmapResponse = response.json().await.map_err(|e| {
            tracing::warn!(error = %e, "Store search returned an unreadable body");
            AppError::with_message(ErrorCode::UpstreamError, "Store search returned an invalid response")
        })?;

        let stores = body.into_stores()?;
        tracing::debug!(city, keywords = %keywords, count = stores.len(), "Store search");
        Ok(stores)
    }
}
