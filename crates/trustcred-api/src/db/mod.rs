//! # Metadata Database
//!
//! PostgreSQL access via SQLx. The database is optional: without
//! `DATABASE_URL` the service runs on an empty in-memory metadata store
//! and verification works from ledger data alone.

pub mod metadata;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

pub use metadata::PgMetadataStore;

/// Connect to `url` and apply the embedded migrations.
pub async fn init_pool(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;
    tracing::info!(max_connections, "metadata database connected");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::debug!("metadata migrations applied");

    Ok(pool)
}
