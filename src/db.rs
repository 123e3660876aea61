//! Postgres connection pooling shared by the user directory and the book
//! repository.

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use std::str::FromStr;
use tokio_postgres::NoTls;

use crate::config::PostgresConfig;

/// Failure to set up or use a pool.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("invalid database URL: {0}")]
    InvalidUrl(#[source] tokio_postgres::Error),

    #[error("failed to build connection pool: {0}")]
    Build(String),

    #[error("failed to acquire connection: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("query failed: {0}")]
    Query(#[from] tokio_postgres::Error),
}

/// Build a lazily-connecting pool. No connection is opened until first use.
pub fn build_pool(config: &PostgresConfig) -> Result<Pool, DbError> {
    let pg_config =
        tokio_postgres::Config::from_str(config.db_url.as_str()).map_err(DbError::InvalidUrl)?;
    let mgr_config = ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    };
    let mgr = Manager::from_config(pg_config, NoTls, mgr_config);
    Pool::builder(mgr)
        .max_size(config.pool_max)
        .build()
        .map_err(|e| DbError::Build(e.to_string()))
}

/// Create the directory and book tables if they are missing.
pub async fn initialize_schema(pool: &Pool) -> Result<(), DbError> {
    let client = pool.get().await?;
    client
        .batch_execute(
            "
        CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            dn VARCHAR(512) NOT NULL UNIQUE,
            given_name VARCHAR(255),
            surname VARCHAR(255)
        );
        CREATE TABLE IF NOT EXISTS user_roles (
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            role_name VARCHAR(64) NOT NULL,
            PRIMARY KEY (user_id, role_name)
        );
        CREATE TABLE IF NOT EXISTS books (
            id BIGSERIAL PRIMARY KEY,
            title VARCHAR(255) NOT NULL,
            author VARCHAR(255) NOT NULL,
            isbn VARCHAR(32) NOT NULL UNIQUE,
            publication_year INTEGER NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            created_by VARCHAR(512) NOT NULL,
            updated_at TIMESTAMPTZ,
            updated_by VARCHAR(512)
        );",
        )
        .await?;
    Ok(())
}
