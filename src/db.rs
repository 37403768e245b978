use sqlx::AnyPool;
use tracing::info;

use crate::error::CustomError;

pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

pub struct Database;

impl Database {
    pub async fn new_pool(url: &str) -> Result<AnyPool, CustomError> {
        sqlx::any::install_default_drivers();
        let pool = sqlx::any::AnyPoolOptions::new()
            .max_connections(10)
            .min_connections(5)
            .idle_timeout(std::time::Duration::from_secs(30))
            .connect(url)
            .await?;
        Ok(pool)
    }

    /// Apply the embedded schema. Every statement is idempotent.
    pub async fn migrate(pool: &AnyPool) -> Result<(), CustomError> {
        sqlx::raw_sql(MIGRATION_001_INITIAL).execute(pool).await?;
        info!("schema migration 001 applied");
        Ok(())
    }

    pub fn log_pool_stats(pool: &AnyPool) {
        let size = pool.size();
        let idle = pool.num_idle() as u32;
        tracing::debug!(
            total = size,
            idle,
            active = size.saturating_sub(idle),
            "db pool stats"
        );
    }
}
