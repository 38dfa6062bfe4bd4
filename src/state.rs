// src/state.rs
use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::inventory::{postgres::PgInventory, InventoryStore};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub inventory: Arc<dyn InventoryStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db_pool: PgPool, config: Config) -> Self {
        let inventory = Arc::new(PgInventory::new(db_pool.clone()));
        Self {
            db_pool,
            inventory,
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
impl AppState {
    /// State over `inventory`; the pool never connects, so only routes that
    /// go through the inventory store are usable.
    pub fn for_tests(inventory: Arc<dyn InventoryStore>, default_acting_user: Option<i64>) -> Self {
        let config = Config {
            database_url: "postgres://localhost/unused".to_string(),
            database_max_connections: 1,
            run_migrations: false,
            host: std::net::IpAddr::from([127, 0, 0, 1]),
            port: 0,
            jwt_secret: "test-secret".to_string(),
            default_acting_user,
        };
        let db_pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .expect("lazy pool");
        Self {
            db_pool,
            inventory,
            config: Arc::new(config),
        }
    }
}
