//! Derived consumption and emission metrics over a reading sequence.
//!
//! Enrichment is pure and recomputed on demand: identical input yields
//! identical output, and nothing here is ever persisted.

use std::collections::BTreeSet;

use meter_client::domain::MeterReading;
use time::{Date, OffsetDateTime};

/// Grid emission factor, kg CO2 per kWh.
pub const EMISSION_FACTOR: f64 = 0.82;

/// A reading plus its derived consumption and emission columns.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedReading {
    pub reading: MeterReading,
    /// Calendar date of `received_at`, used for daily grouping.
    pub date: Date,
    /// Energy increment since the previous reading in sequence order.
    /// Never negative.
    pub delta_kwh: f64,
    /// `delta_kwh * EMISSION_FACTOR`; derived, never independently set.
    pub instant_emission: f64,
}

/// Compute delta and emission columns for a reading sequence.
///
/// Input is re-sorted ascending by `received_at` (stable) to defend against
/// an adapter handing back unsorted data. The first reading has no baseline
/// and gets a zero delta. A counter decrease (device reset, clock
/// reordering, duplicate retransmission) is clamped to zero, not estimated.
/// A missing counter zeroes the step into and out of the gap.
pub fn enrich(readings: &[MeterReading]) -> Vec<EnrichedReading> {
    let mut ordered: Vec<MeterReading> = readings.to_vec();
    ordered.sort_by_key(|r| r.received_at);

    let mut enriched = Vec::with_capacity(ordered.len());
    let mut prev_kwh: Option<f64> = None;
    for reading in ordered {
        let delta_kwh = match (prev_kwh, reading.kwh) {
            (Some(prev), Some(cur)) => (cur - prev).max(0.0),
            _ => 0.0,
        };
        prev_kwh = reading.kwh;

        enriched.push(EnrichedReading {
            date: reading.received_at.date(),
            delta_kwh,
            instant_emission: delta_kwh * EMISSION_FACTOR,
            reading,
        });
    }

    enriched
}

/// Emission aggregates over an enriched sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CarbonMetrics {
    /// Emission of the most recent reading.
    pub instant_emission: f64,
    /// Sum over readings dated today.
    pub daily_emission: f64,
    /// Sum over the full sequence.
    pub total_emission: f64,
    /// Total divided by the number of distinct dates; 0 when no dates.
    pub avg_daily_emission: f64,
}

pub fn carbon_metrics(enriched: &[EnrichedReading]) -> CarbonMetrics {
    carbon_metrics_at(enriched, OffsetDateTime::now_utc().date())
}

pub fn carbon_metrics_at(enriched: &[EnrichedReading], today: Date) -> CarbonMetrics {
    let Some(latest) = enriched.last() else {
        return CarbonMetrics::default();
    };

    let total_emission: f64 = enriched.iter().map(|e| e.instant_emission).sum();
    let daily_emission: f64 = enriched
        .iter()
        .filter(|e| e.date == today)
        .map(|e| e.instant_emission)
        .sum();

    let distinct_dates: BTreeSet<Date> = enriched.iter().map(|e| e.date).collect();
    let avg_daily_emission = if distinct_dates.is_empty() {
        0.0
    } else {
        total_emission / distinct_dates.len() as f64
    };

    CarbonMetrics {
        instant_emission: latest.instant_emission,
        daily_emission,
        total_emission,
        avg_daily_emission,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn reading(received_at: OffsetDateTime, kwh: Option<f64>) -> MeterReading {
        MeterReading {
            source: "meter-1".to_string(),
            received_at,
            voltage: Some(230.0),
            current: Some(5.0),
            power_factor: Some(0.95),
            load_kw: Some(1.2),
            kwh,
            frequency: Some(50.0),
            retry_count: Some(0),
        }
    }

    fn minute_series(kwh: &[f64]) -> Vec<MeterReading> {
        kwh.iter()
            .enumerate()
            .map(|(i, &k)| {
                reading(
                    datetime!(2024-06-01 10:00:00 UTC) + time::Duration::minutes(i as i64),
                    Some(k),
                )
            })
            .collect()
    }

    #[test]
    fn counter_reset_is_clamped_to_zero() {
        let enriched = enrich(&minute_series(&[10.0, 12.0, 3.0, 5.0]));
        let deltas: Vec<f64> = enriched.iter().map(|e| e.delta_kwh).collect();
        assert_eq!(deltas, vec![0.0, 2.0, 0.0, 2.0]);
        assert!(enriched.iter().all(|e| e.delta_kwh >= 0.0));
    }

    #[test]
    fn emission_is_delta_times_factor() {
        let enriched = enrich(&minute_series(&[100.0, 101.5, 103.0]));
        for e in &enriched {
            assert!((e.instant_emission - e.delta_kwh * EMISSION_FACTOR).abs() < 1e-12);
        }
    }

    #[test]
    fn unsorted_input_is_resorted_before_deltas() {
        let readings = vec![
            reading(datetime!(2024-06-01 10:02:00 UTC), Some(103.0)),
            reading(datetime!(2024-06-01 10:00:00 UTC), Some(100.0)),
            reading(datetime!(2024-06-01 10:01:00 UTC), Some(101.5)),
        ];
        let enriched = enrich(&readings);
        let deltas: Vec<f64> = enriched.iter().map(|e| e.delta_kwh).collect();
        assert_eq!(deltas, vec![0.0, 1.5, 1.5]);
    }

    #[test]
    fn missing_counter_zeroes_both_sides_of_the_gap() {
        let readings = vec![
            reading(datetime!(2024-06-01 10:00:00 UTC), Some(100.0)),
            reading(datetime!(2024-06-01 10:01:00 UTC), None),
            reading(datetime!(2024-06-01 10:02:00 UTC), Some(104.0)),
            reading(datetime!(2024-06-01 10:03:00 UTC), Some(105.0)),
        ];
        let enriched = enrich(&readings);
        let deltas: Vec<f64> = enriched.iter().map(|e| e.delta_kwh).collect();
        assert_eq!(deltas, vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn enrichment_is_idempotent() {
        let readings = minute_series(&[10.0, 12.0, 3.0, 5.0]);
        let once = enrich(&readings);
        let raw: Vec<MeterReading> = once.iter().map(|e| e.reading.clone()).collect();
        let twice = enrich(&raw);

        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(&twice) {
            assert_eq!(a.delta_kwh, b.delta_kwh);
            assert_eq!(a.instant_emission, b.instant_emission);
        }
    }

    #[test]
    fn empty_and_single_inputs_are_zeroed() {
        assert!(enrich(&[]).is_empty());
        assert_eq!(carbon_metrics(&[]), CarbonMetrics::default());

        let one = enrich(&minute_series(&[42.0]));
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].delta_kwh, 0.0);
        assert_eq!(one[0].instant_emission, 0.0);
    }

    #[test]
    fn total_equals_sum_of_instants_and_factor_times_deltas() {
        let enriched = enrich(&minute_series(&[10.0, 12.0, 3.0, 5.0, 9.0]));
        let metrics = carbon_metrics_at(&enriched, date!(2024-06-01));

        let instant_sum: f64 = enriched.iter().map(|e| e.instant_emission).sum();
        let delta_sum: f64 = enriched.iter().map(|e| e.delta_kwh).sum();
        assert_eq!(metrics.total_emission, instant_sum);
        assert!((metrics.total_emission - EMISSION_FACTOR * delta_sum).abs() < 1e-9);
    }

    #[test]
    fn daily_emission_counts_only_today() {
        let readings = vec![
            reading(datetime!(2024-06-01 23:59:00 UTC), Some(100.0)),
            reading(datetime!(2024-06-02 00:01:00 UTC), Some(102.0)),
            reading(datetime!(2024-06-02 00:02:00 UTC), Some(103.0)),
        ];
        let enriched = enrich(&readings);

        let metrics = carbon_metrics_at(&enriched, date!(2024-06-02));
        assert!((metrics.daily_emission - 3.0 * EMISSION_FACTOR).abs() < 1e-9);
        assert_eq!(metrics.instant_emission, enriched.last().unwrap().instant_emission);
    }

    #[test]
    fn average_daily_divides_by_distinct_dates() {
        // Three distinct dates; scale deltas so the total is exactly 9.0 kg.
        let step = 9.0 / EMISSION_FACTOR / 3.0;
        let readings = vec![
            reading(datetime!(2024-06-01 10:00:00 UTC), Some(0.0)),
            reading(datetime!(2024-06-01 11:00:00 UTC), Some(step)),
            reading(datetime!(2024-06-02 10:00:00 UTC), Some(2.0 * step)),
            reading(datetime!(2024-06-03 10:00:00 UTC), Some(3.0 * step)),
        ];
        let enriched = enrich(&readings);
        let metrics = carbon_metrics_at(&enriched, date!(2024-06-03));

        assert!((metrics.total_emission - 9.0).abs() < 1e-9);
        assert!((metrics.avg_daily_emission - 3.0).abs() < 1e-9);
    }
}
