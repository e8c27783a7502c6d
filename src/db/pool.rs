//! Database connection pool management

use deadpool_postgres::{Config, Pool, PoolConfig, Runtime, ManagerConfig, RecyclingMethod};
use tokio_postgres::NoTls;
use thiserror::Error;
use tracing::info;

/// Address book schema. Idempotent; applied at startup.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS customers (
    customer_id     BIGSERIAL PRIMARY KEY,
    customer_name   TEXT NOT NULL,
    carrier_account TEXT,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS shipping_locations (
    location_id      BIGSERIAL PRIMARY KEY,
    customer_id      BIGINT NOT NULL REFERENCES customers(customer_id),
    location_name    TEXT NOT NULL,
    address_street   TEXT NOT NULL,
    address_city     TEXT NOT NULL,
    address_province TEXT NOT NULL,
    address_postal   TEXT NOT NULL,
    address_country  TEXT NOT NULL DEFAULT 'CA',
    phone_number     TEXT,
    is_default       BOOLEAN NOT NULL DEFAULT FALSE,
    created_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at       TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS sales_orders (
    order_id     TEXT PRIMARY KEY,
    customer_id  BIGINT NOT NULL,
    location_id  BIGINT NOT NULL,
    shipment_pin TEXT,
    status       TEXT NOT NULL DEFAULT 'pending'
                 CHECK (status IN ('pending', 'shipped', 'cancelled')),
    weight       DOUBLE PRECISION,
    service_id   TEXT,
    reference    TEXT,
    created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    shipped_at   TIMESTAMPTZ
);

CREATE INDEX IF NOT EXISTS idx_customer_name ON customers (customer_name);
CREATE INDEX IF NOT EXISTS idx_location_customer ON shipping_locations (customer_id);
CREATE INDEX IF NOT EXISTS idx_order_status ON sales_orders (status);
CREATE UNIQUE INDEX IF NOT EXISTS idx_location_single_default
    ON shipping_locations (customer_id) WHERE is_default;
"#;

/// Database-related errors
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::CreatePoolError),
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),
    #[error("Pool get error: {0}")]
    PoolGet(#[from] deadpool_postgres::PoolError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    pool: Pool,
}

impl DbPool {
    /// Create a new database pool from a connection string
    pub fn new(database_url: &str, max_connections: Option<usize>) -> Result<Self, DbError> {
        if database_url.is_empty() {
            return Err(DbError::Config(
                "DATABASE_URL is not set (or RFSHIP_DATABASE__URL)".to_string(),
            ));
        }

        let url = url::Url::parse(database_url)
            .map_err(|e| DbError::Config(format!("Invalid database URL: {}", e)))?;

        let host = url.host_str()
            .ok_or_else(|| DbError::Config("Missing host in DATABASE_URL".to_string()))?;
        let port = url.port().unwrap_or(5432);
        let user = url.username();
        let password = url.password().unwrap_or("");
        let dbname = url.path().trim_start_matches('/');

        let mut cfg = Config::new();
        cfg.host = Some(host.to_string());
        cfg.port = Some(port);
        cfg.user = Some(user.to_string());
        cfg.password = Some(password.to_string());
        cfg.dbname = Some(dbname.to_string());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        if let Some(max_size) = max_connections {
            cfg.pool = Some(PoolConfig::new(max_size));
        }

        let pool = cfg.create_pool(Some(Runtime::Tokio1), NoTls)?;

        info!(
            host = %host,
            port = %port,
            dbname = %dbname,
            "Database pool created"
        );

        Ok(DbPool { pool })
    }

    /// Get a connection from the pool
    pub async fn get(&self) -> Result<deadpool_postgres::Object, DbError> {
        Ok(self.pool.get().await?)
    }

    /// Create tables and indexes that don't exist yet
    pub async fn init_schema(&self) -> Result<(), DbError> {
        let client = self.get().await?;
        client.batch_execute(SCHEMA_SQL).await?;
        info!("Address book schema ready");
        Ok(())
    }
}
