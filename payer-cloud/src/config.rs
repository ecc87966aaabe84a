//! Server configuration

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    /// PostgreSQL connection URL; `None` runs on the in-memory store (development only)
    pub database_url: Option<String>,
    /// HTTP port
    pub http_port: u16,
    /// HS256 secret for customer tokens
    pub jwt_secret: String,
    /// Customer token lifetime
    pub jwt_expiry_hours: i64,
    /// New orders wait for payment before entering the merchant queue
    pub require_payment: bool,
    /// Amap web service key (store search)
    pub amap_api_key: Option<String>,
    /// Amap place text search endpoint
    pub amap_api_url: String,
    /// Brand keyword prefixed to every store search
    pub store_search_keyword: String,
    /// Allowed CORS origin, `*` for any
    pub cors_allow_origin: String,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    fn parse_bool(name: &str) -> bool {
        std::env::var(name)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let database_url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        if database_url.is_none() && environment != "development" {
            return Err(format!("DATABASE_URL must be set in {environment} environment").into());
        }

        Ok(Self {
            database_url,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            jwt_expiry_hours: std::env::var("JWT_EXPIRY_HOURS")
                .ok()
                .and_then(|h| h.parse().ok())
                .filter(|h: &i64| *h > 0)
                .unwrap_or(24),
            require_payment: Self::parse_bool("REQUIRE_PAYMENT"),
            amap_api_key: std::env::var("AMAP_API_KEY").ok().filter(|s| !s.is_empty()),
            amap_api_url: std::env::var("AMAP_API_URL")
                .unwrap_or_else(|_| "https://restapi.amap.com/v3/place/text".into()),
            store_search_keyword: std::env::var("STORE_SEARCH_KEYWORD")
                .unwrap_or_else(|_| "瑞幸咖啡".into()),
            cors_allow_origin: std::env::var("CORS_ALLOW_ORIGIN").unwrap_or_else(|_| "*".into()),
            environment,
        })
    }

    /// Development defaults without touching the process environment
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            environment: "development".into(),
            database_url: None,
            http_port: 0,
            jwt_secret: "test-secret".into(),
            jwt_expiry_hours: 24,
            require_payment: false,
            amap_api_key: None,
            amap_api_url: "http://127.0.0.1:9/v3/place/text".into(),
            store_search_keyword: "瑞幸咖啡".into(),
            cors_allow_origin: "*".into(),
        }
    }
}
