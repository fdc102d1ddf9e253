use time::OffsetDateTime;

/// One telemetry sample from an energy meter.
///
/// `source` and `received_at` are always present; every numeric column is
/// nullable at the ingestion boundary and stays `Option` here so consumers
/// must handle absence explicitly.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct MeterReading {
    pub source: String,
    pub received_at: OffsetDateTime,
    pub voltage: Option<f64>,
    pub current: Option<f64>,
    pub power_factor: Option<f64>,
    pub load_kw: Option<f64>,
    /// Cumulative energy counter. Monotonically non-decreasing except when
    /// the device resets.
    pub kwh: Option<f64>,
    pub frequency: Option<f64>,
    /// Transmission retries reported by the originating device.
    pub retry_count: Option<i64>,
}
