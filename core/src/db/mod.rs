//! Postgres persistence adapter (A2, ambient).
//!
//! Grounded on the teacher's `DatabaseConfig`/`DatabaseManager` pairing in
//! `database/mod.rs`: a config struct loaded from environment variables with
//! defaults, and a thin connect constructor that builds a pool and can run
//! migrations. [`PgStore`] itself mirrors `DslDomainRepository` implementing
//! the async repository trait over `sqlx::query_as`.

mod postgres;

pub use postgres::PgStore;

use std::time::Duration;

/// Connection parameters for [`PgStore::connect`], modeled on the teacher's
/// `DatabaseConfig`.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub connection_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl StoreConfig {
    /// Reads `DATABASE_URL` plus optional pool-tuning variables, falling
    /// back to the teacher's defaults when unset.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let connection_timeout = std::env::var("DATABASE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));

        let idle_timeout = std::env::var("DATABASE_IDLE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(600));

        let max_lifetime = std::env::var("DATABASE_MAX_LIFETIME_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(1800));

        Ok(Self {
            database_url,
            max_connections,
            connection_timeout,
            idle_timeout,
            max_lifetime,
        })
    }
}
