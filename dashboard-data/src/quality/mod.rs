//! Data-quality assessment of a reading sequence.
//!
//! Checks run independently and accumulate; anomalies are flagged, never
//! raised. Issues dominate warnings in the tri-level outcome.

use std::collections::HashSet;

use meter_client::domain::MeterReading;
use time::{Duration, OffsetDateTime};

/// Acceptable grid voltage band, volts. Readings outside it are treated as
/// sensor noise, not grid faults.
pub const VOLTAGE_RANGE: (f64, f64) = (100.0, 300.0);

/// Acceptable grid frequency band, hertz (nominal 50). Deviation indicates
/// grid instability and is more severe than a voltage excursion.
pub const FREQ_RANGE: (f64, f64) = (48.0, 52.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityStatus {
    NoData,
    Poor,
    Fair,
    Good,
}

#[derive(Debug, Clone)]
pub struct QualityReport {
    pub status: QualityStatus,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub total_readings: usize,
    pub date_range: Option<(OffsetDateTime, OffsetDateTime)>,
}

pub fn assess(readings: &[MeterReading]) -> QualityReport {
    assess_at(readings, OffsetDateTime::now_utc())
}

pub fn assess_at(readings: &[MeterReading], now: OffsetDateTime) -> QualityReport {
    if readings.is_empty() {
        return QualityReport {
            status: QualityStatus::NoData,
            issues: vec!["No data available".to_string()],
            warnings: Vec::new(),
            total_readings: 0,
            date_range: None,
        };
    }

    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    let missing = missing_columns(readings);
    if !missing.is_empty() {
        warnings.push(format!("Missing values in columns: {}", missing.join(", ")));
    }

    let mut seen = HashSet::new();
    if readings.iter().any(|r| !seen.insert(r.received_at)) {
        issues.push("Duplicate timestamps detected".to_string());
    }

    let extreme_voltage = readings
        .iter()
        .filter(|r| {
            r.voltage
                .is_some_and(|v| v < VOLTAGE_RANGE.0 || v > VOLTAGE_RANGE.1)
        })
        .count();
    if extreme_voltage > 0 {
        warnings.push(format!(
            "{extreme_voltage} readings with extreme voltage values"
        ));
    }

    let freq_out = readings
        .iter()
        .filter(|r| {
            r.frequency
                .is_some_and(|f| f < FREQ_RANGE.0 || f > FREQ_RANGE.1)
        })
        .count();
    if freq_out > 0 {
        issues.push(format!("{freq_out} readings with frequency out of range"));
    }

    let newest = readings.iter().map(|r| r.received_at).max();
    let oldest = readings.iter().map(|r| r.received_at).min();
    if let Some(newest) = newest {
        let age = now - newest;
        if age > Duration::minutes(5) {
            warnings.push(format!("Latest reading is {age} old"));
        }
        if age > Duration::hours(1) {
            issues.push("No recent data received (> 1 hour)".to_string());
        }
    }

    let status = if !issues.is_empty() {
        QualityStatus::Poor
    } else if !warnings.is_empty() {
        QualityStatus::Fair
    } else {
        QualityStatus::Good
    };

    QualityReport {
        status,
        issues,
        warnings,
        total_readings: readings.len(),
        date_range: oldest.zip(newest),
    }
}

/// Names of the nullable columns with at least one absent value, in the
/// data model's column order.
fn missing_columns(readings: &[MeterReading]) -> Vec<&'static str> {
    let checks: [(&'static str, fn(&MeterReading) -> bool); 7] = [
        ("voltage", |r| r.voltage.is_none()),
        ("current", |r| r.current.is_none()),
        ("power_factor", |r| r.power_factor.is_none()),
        ("load_kw", |r| r.load_kw.is_none()),
        ("kwh", |r| r.kwh.is_none()),
        ("frequency", |r| r.frequency.is_none()),
        ("retry_count", |r| r.retry_count.is_none()),
    ];

    checks
        .into_iter()
        .filter(|(_, has_none)| readings.iter().any(has_none))
        .map(|(name, _)| name)
        .collect()
}

/// Single-value frequency check used for live alert banners.
pub fn frequency_alert(frequency: Option<f64>) -> Option<String> {
    let f = frequency?;
    if f < FREQ_RANGE.0 || f > FREQ_RANGE.1 {
        Some(format!(
            "Frequency out of range: {f:.2} Hz (Normal: {}-{} Hz)",
            FREQ_RANGE.0, FREQ_RANGE.1
        ))
    } else {
        None
    }
}
