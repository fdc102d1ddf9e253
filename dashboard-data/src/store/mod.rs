//! Reading Store Adapter: fetches a bounded window of readings from an
//! ordered list of providers, falling back down the chain on failure.
//!
//! Callers never see transport errors; an exhausted chain yields an empty
//! sequence, which downstream code treats as "no data yet".

pub mod cache;
pub mod http_api;
pub mod sqlite;

pub use cache::ResultCache;
pub use http_api::HttpApiProvider;
pub use sqlite::SqliteProvider;

use meter_client::db::StoreStats;
use meter_client::domain::MeterReading;
use time::OffsetDateTime;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("http source error: {0}")]
    Http(String),
    #[error("database source error: {0}")]
    Database(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// One data provider in the failover chain. Primary and secondary sources
/// implement the same query contract.
#[async_trait::async_trait]
pub trait ReadingProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch up to `limit` readings, optionally restricted to one device.
    /// Ordering is provider-defined; the store normalizes to ascending.
    async fn fetch_readings(
        &self,
        source_filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MeterReading>, StoreError>;

    /// Point-in-time statistics for the system status view.
    async fn stats(&self) -> Result<StoreStats, StoreError>;
}

/// Connectivity and freshness snapshot consumed by presentation.
#[derive(Debug, Clone, Default)]
pub struct SystemStatus {
    pub database_connected: bool,
    pub total_readings: i64,
    pub last_24h_readings: i64,
    pub database_size_mb: f64,
    pub last_reading_time: Option<OffsetDateTime>,
}

pub struct ReadingStore {
    providers: Vec<Box<dyn ReadingProvider>>,
    cache: ResultCache,
}

impl ReadingStore {
    pub fn new(providers: Vec<Box<dyn ReadingProvider>>, cache: ResultCache) -> Self {
        Self { providers, cache }
    }

    /// Fetch readings sorted ascending by `received_at`, serving repeat
    /// requests for the same `(source_filter, limit)` pair from the cache.
    pub async fn fetch(&self, source_filter: Option<&str>, limit: usize) -> Vec<MeterReading> {
        if let Some(hit) = self.cache.get(source_filter, limit) {
            return hit;
        }

        let readings = self.fetch_uncached(source_filter, limit).await;
        self.cache.insert(source_filter, limit, readings.clone());
        readings
    }

    /// Walk the provider chain, taking the first non-empty success. All
    /// providers failing or empty yields an empty vec, never an error.
    pub async fn fetch_uncached(
        &self,
        source_filter: Option<&str>,
        limit: usize,
    ) -> Vec<MeterReading> {
        for provider in &self.providers {
            match provider.fetch_readings(source_filter, limit).await {
                Ok(mut readings) if !readings.is_empty() => {
                    readings.sort_by_key(|r| r.received_at);
                    return readings;
                }
                Ok(_) => {
                    tracing::debug!(
                        provider = provider.name(),
                        "provider returned no readings, trying next"
                    );
                }
                Err(e) => {
                    metrics::counter!("store_provider_failures_total").increment(1);
                    tracing::warn!(
                        provider = provider.name(),
                        error = %e,
                        "provider failed, falling back"
                    );
                }
            }
        }

        Vec::new()
    }

    /// Drop all cached results; the next fetch goes back to the sources.
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    /// System health from the first provider whose statistics probe
    /// succeeds. All providers unreachable yields a disconnected status
    /// with zeroed counts.
    pub async fn system_status(&self) -> SystemStatus {
        for provider in &self.providers {
            match provider.stats().await {
                Ok(stats) => {
                    return SystemStatus {
                        database_connected: true,
                        total_readings: stats.total_readings,
                        last_24h_readings: stats.last_24h_readings,
                        database_size_mb: stats.database_size_mb,
                        last_reading_time: stats.latest_timestamp,
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        provider = provider.name(),
                        error = %e,
                        "statistics probe failed, falling back"
                    );
                }
            }
        }

        SystemStatus::default()
    }

    /// Sorted distinct device identifiers seen in an unfiltered fetch.
    pub async fn device_list(&self, limit: usize) -> Vec<String> {
        let readings = self.fetch(None, limit).await;
        let mut sources: Vec<String> = readings.into_iter().map(|r| r.source).collect();
        sources.sort();
        sources.dedup();
        sources
    }
}
