use anyhow::Result;
use dashboard_data::{
    carbon,
    config::AppConfig,
    observability, quality, report,
    store::{HttpApiProvider, ReadingProvider, ReadingStore, ResultCache, SqliteProvider},
};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    let providers: Vec<Box<dyn ReadingProvider>> = vec![
        Box::new(HttpApiProvider::new(
            &cfg.api.base_url,
            Duration::from_secs(cfg.api.timeout_secs),
        )?),
        Box::new(SqliteProvider::new(&cfg.database.path)),
    ];
    let store = ReadingStore::new(
        providers,
        ResultCache::new(Duration::from_secs(cfg.fetch.cache_ttl_secs)),
    );

    let status = store.system_status().await;
    tracing::info!(
        database_connected = status.database_connected,
        total_readings = status.total_readings,
        last_24h_readings = status.last_24h_readings,
        database_size_mb = status.database_size_mb,
        last_reading_time = ?status.last_reading_time,
        "system status"
    );

    let readings = store.fetch(None, cfg.fetch.default_limit).await;
    let devices = store.device_list(cfg.fetch.default_limit).await;
    tracing::info!(readings = readings.len(), devices = ?devices, "fetched reading window");

    let enriched = carbon::enrich(&readings);
    let metrics = carbon::carbon_metrics(&enriched);
    tracing::info!(
        instant_emission_kg = metrics.instant_emission,
        daily_emission_kg = metrics.daily_emission,
        total_emission_kg = metrics.total_emission,
        avg_daily_emission_kg = metrics.avg_daily_emission,
        "carbon metrics"
    );

    let quality_report = quality::assess(&readings);
    tracing::info!(
        status = ?quality_report.status,
        total_readings = quality_report.total_readings,
        date_range = ?quality_report.date_range,
        "data quality"
    );
    for issue in &quality_report.issues {
        tracing::warn!(issue = %issue, "quality issue");
    }
    for warning in &quality_report.warnings {
        tracing::info!(warning = %warning, "quality warning");
    }

    if let Some(latest) = report::latest_snapshot(&readings) {
        if let Some(alert) = quality::frequency_alert(latest.frequency) {
            tracing::warn!(alert = %alert, source = %latest.source, "grid frequency alert");
        }
    }

    let stats = report::summary_statistics(&readings, &report::MetricColumn::ALL);
    for (column, s) in &stats {
        tracing::info!(
            column = column.name(),
            mean = s.mean,
            min = s.min,
            max = s.max,
            std = s.std,
            "column statistics"
        );
    }
    tracing::info!(
        error_readings = report::error_reading_count(&readings),
        frequency_violations = report::frequency_violation_count(&readings),
        distinct_sources = report::distinct_source_count(&readings),
        "derived counts"
    );

    Ok(())
}
