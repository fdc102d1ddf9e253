//! Summary statistics and derived counts over the raw reading stream.

use std::collections::{BTreeMap, BTreeSet};

use meter_client::domain::MeterReading;
use time::OffsetDateTime;

use crate::quality::FREQ_RANGE;

/// Numeric reading columns that can be summarized or plotted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MetricColumn {
    Voltage,
    Current,
    PowerFactor,
    LoadKw,
    Kwh,
    Frequency,
}

impl MetricColumn {
    pub const ALL: [MetricColumn; 6] = [
        MetricColumn::Voltage,
        MetricColumn::Current,
        MetricColumn::PowerFactor,
        MetricColumn::LoadKw,
        MetricColumn::Kwh,
        MetricColumn::Frequency,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MetricColumn::Voltage => "voltage",
            MetricColumn::Current => "current",
            MetricColumn::PowerFactor => "power_factor",
            MetricColumn::LoadKw => "load_kw",
            MetricColumn::Kwh => "kwh",
            MetricColumn::Frequency => "frequency",
        }
    }

    fn value(self, reading: &MeterReading) -> Option<f64> {
        match self {
            MetricColumn::Voltage => reading.voltage,
            MetricColumn::Current => reading.current,
            MetricColumn::PowerFactor => reading.power_factor,
            MetricColumn::LoadKw => reading.load_kw,
            MetricColumn::Kwh => reading.kwh,
            MetricColumn::Frequency => reading.frequency,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Sample standard deviation (n - 1); 0.0 for a single value.
    pub std: f64,
}

/// Per-column statistics over present values only. Columns with no present
/// values are omitted from the result.
pub fn summary_statistics(
    readings: &[MeterReading],
    columns: &[MetricColumn],
) -> BTreeMap<MetricColumn, ColumnStats> {
    let mut out = BTreeMap::new();

    for &column in columns {
        let values: Vec<f64> = readings.iter().filter_map(|r| column.value(r)).collect();
        if values.is_empty() {
            continue;
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let std = if values.len() > 1 {
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            0.0
        };

        out.insert(column, ColumnStats { mean, min, max, std });
    }

    out
}

/// Readings whose originating device reported at least one retry.
pub fn error_reading_count(readings: &[MeterReading]) -> usize {
    readings
        .iter()
        .filter(|r| r.retry_count.is_some_and(|c| c > 0))
        .count()
}

/// Readings with frequency outside the acceptable band.
pub fn frequency_violation_count(readings: &[MeterReading]) -> usize {
    readings
        .iter()
        .filter(|r| {
            r.frequency
                .is_some_and(|f| f < FREQ_RANGE.0 || f > FREQ_RANGE.1)
        })
        .count()
}

pub fn distinct_source_count(readings: &[MeterReading]) -> usize {
    readings
        .iter()
        .map(|r| r.source.as_str())
        .collect::<BTreeSet<_>>()
        .len()
}

/// The most recent reading, for the headline dashboard cards.
pub fn latest_snapshot(readings: &[MeterReading]) -> Option<&MeterReading> {
    readings.iter().max_by_key(|r| r.received_at)
}

/// Timestamped values of one column, absent values dropped. Input order is
/// preserved.
pub fn time_series(readings: &[MeterReading], column: MetricColumn) -> Vec<(OffsetDateTime, f64)> {
    readings
        .iter()
        .filter_map(|r| column.value(r).map(|v| (r.received_at, v)))
        .collect()
}
