use anyhow::Result;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use time::{Duration, OffsetDateTime};

use crate::domain::MeterReading;

/// Point-in-time statistics about the reading store.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub total_readings: i64,
    pub last_24h_readings: i64,
    pub database_size_mb: f64,
    pub latest_timestamp: Option<OffsetDateTime>,
}

/// Fetch the most recent readings, optionally restricted to a single device.
///
/// Rows come back newest-first; callers wanting chronological order reverse
/// the result.
pub async fn recent_readings(
    pool: &SqlitePool,
    source: Option<&str>,
    limit: i64,
) -> Result<Vec<MeterReading>> {
    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT source, received_at, voltage, current, power_factor, load_kw, kwh, frequency, retry_count \
         FROM meter_readings",
    );

    if let Some(source) = source {
        builder.push(" WHERE source = ").push_bind(source);
    }
    builder.push(" ORDER BY received_at DESC LIMIT ").push_bind(limit);

    let rows = builder
        .build_query_as::<MeterReading>()
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Row counts, rolling-24h count, storage size, and the newest timestamp.
pub async fn store_stats(pool: &SqlitePool) -> Result<StoreStats> {
    let total_readings: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM meter_readings")
        .fetch_one(pool)
        .await?;

    let cutoff = OffsetDateTime::now_utc() - Duration::days(1);
    let last_24h_readings: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM meter_readings WHERE received_at >= ?")
            .bind(cutoff)
            .fetch_one(pool)
            .await?;

    let latest_timestamp: Option<OffsetDateTime> =
        sqlx::query_scalar("SELECT MAX(received_at) FROM meter_readings")
            .fetch_one(pool)
            .await?;

    let page_count: i64 = sqlx::query_scalar("PRAGMA page_count").fetch_one(pool).await?;
    let page_size: i64 = sqlx::query_scalar("PRAGMA page_size").fetch_one(pool).await?;
    let database_size_mb = (page_count * page_size) as f64 / (1024.0 * 1024.0);

    Ok(StoreStats {
        total_readings,
        last_24h_readings,
        database_size_mb,
        latest_timestamp,
    })
}
