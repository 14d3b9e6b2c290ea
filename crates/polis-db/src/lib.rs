//! # polis-db
//!
//! Store implementations for Polis:
//! - **PostgreSQL** — [`PgUnitOfWork`], one transaction per trigger invocation
//! - **In-memory** — [`MemoryStore`], for tests and single-process deployments

pub mod memory;
pub mod postgres;
pub mod repository;

pub use memory::{MemoryState, MemoryStore};
pub use postgres::PgUnitOfWork;

use anyhow::Result;
use sqlx::PgPool;

/// Shared database handle.
#[derive(Clone)]
pub struct Database {
    pub pg: PgPool,
}

impl Database {
    /// Connect to PostgreSQL.
    pub async fn connect(config: &polis_common::config::AppConfig) -> Result<Self> {
        tracing::info!("Connecting to PostgreSQL...");
        let pg = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .connect(&config.database.url)
            .await?;

        tracing::info!("Connected to PostgreSQL");

        Ok(Self { pg })
    }

    /// Run pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pg).await?;
        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Open a unit of work.
    pub async fn begin(&self) -> polis_common::error::PolisResult<PgUnitOfWork> {
        PgUnitOfWork::begin(&self.pg).await
    }

    pub async fn is_healthy(&self) -> bool {
        postgres::health_check(&self.pg).await
    }
}
