use std::path::PathBuf;

use meter_client::db::{self, StoreStats};
use meter_client::domain::MeterReading;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use super::{ReadingProvider, StoreError};

/// Secondary provider: the local file-backed reading store.
///
/// Opens the database read-only per call; this layer holds no connection
/// across requests. A missing backing file is an error, which the store
/// treats as fallback-exhausted for this provider.
pub struct SqliteProvider {
    path: PathBuf,
}

impl SqliteProvider {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    async fn pool(&self) -> Result<SqlitePool, StoreError> {
        if !self.path.exists() {
            return Err(StoreError::Database(format!(
                "database file {} not found",
                self.path.display()
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .read_only(true);

        SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

#[async_trait::async_trait]
impl ReadingProvider for SqliteProvider {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn fetch_readings(
        &self,
        source_filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MeterReading>, StoreError> {
        let pool = self.pool().await?;
        let mut rows = db::recent_readings(&pool, source_filter, limit as i64)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        pool.close().await;

        // Query is newest-first so the limit keeps the most recent window;
        // hand back chronological order.
        rows.reverse();
        Ok(rows)
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let pool = self.pool().await?;
        let stats = db::store_stats(&pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        pool.close().await;
        Ok(stats)
    }
}
