//! Application state for payer-cloud

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

use crate::config::Config;
use crate::db::{MemoryStore, MenuRepository, OrderRepository, PgStore};
use crate::error::BoxError;
use crate::live::{LocalRoomBroker, Notifier, RoomBroker};
use crate::orders::OrderService;
use crate::stores::StoreSearch;

const MAX_DB_CONNECTIONS: u32 = 10;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Order lifecycle (the only writer of order status)
    pub orders: OrderService,
    /// Menu catalogue
    pub menu: Arc<dyn MenuRepository>,
    /// Realtime rooms used by the WebSocket endpoint
    pub broker: Arc<dyn RoomBroker>,
    /// HS256 secret for customer tokens
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    /// Amap client
    pub store_search: StoreSearch,
    /// Allowed CORS origin
    pub cors_allow_origin: String,
}

impl AppState {
    /// Connect to PostgreSQL and run migrations, or fall back to the seeded
    /// in-memory store when no database is configured.
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        match &config.database_url {
            Some(url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(MAX_DB_CONNECTIONS)
                    .connect(url)
                    .await?;
                sqlx::migrate!("./migrations").run(&pool).await?;
                tracing::info!("Database ready");

                let store = Arc::new(PgStore::new(pool));
                Self::assemble(config, store.clone(), store)
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using the in-memory demo store");
                Ok(Self::in_memory(config, MemoryStore::with_demo_data())?)
            }
        }
    }

    /// State over an in-memory store
    pub fn in_memory(config: &Config, store: MemoryStore) -> Result<Self, BoxError> {
        let store = Arc::new(store);
        Self::assemble(config, store.clone(), store)
    }

    fn assemble(
        config: &Config,
        orders: Arc<dyn OrderRepository>,
        menu: Arc<dyn MenuRepository>,
    ) -> Result<Self, BoxError> {
        let broker: Arc<dyn RoomBroker> = Arc::new(LocalRoomBroker::new());
        let notifier = Notifier::new(broker.clone());

        Ok(Self {
            orders: OrderService::new(orders, menu.clone(), notifier)
                .with_payment_gate(config.require_payment),
            menu,
            broker,
            jwt_secret: config.jwt_secret.clone(),
            jwt_expiry_hours: config.jwt_expiry_hours,
            store_search: StoreSearch::new(config)?,
            cors_allow_origin: config.cors_allow_origin.clone(),
        })
    }
}
