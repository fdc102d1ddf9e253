//! CSV export of the enriched reading sequence.
//!
//! Column order and presence match the enriched field set exactly so an
//! export re-parses to the same values.

use csv::StringRecord;
use meter_client::domain::MeterReading;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::carbon::EnrichedReading;

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(String),
    #[error("field error: {0}")]
    Field(String),
}

pub const CSV_HEADER: [&str; 12] = [
    "source",
    "received_at",
    "voltage",
    "current",
    "power_factor",
    "load_kw",
    "kwh",
    "frequency",
    "retry_count",
    "date",
    "delta_kwh",
    "instant_emission",
];

fn fmt_opt_f64(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

fn fmt_opt_i64(v: Option<i64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

/// Serialize an enriched sequence, one row per reading, RFC 3339 timestamps,
/// empty cells for absent values.
pub fn write_csv(enriched: &[EnrichedReading]) -> Result<String, ExportError> {
    let date_format = format_description!("[year]-[month]-[day]");

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(CSV_HEADER)
        .map_err(|e| ExportError::Csv(e.to_string()))?;

    for e in enriched {
        let r = &e.reading;
        let received_at = r
            .received_at
            .format(&Rfc3339)
            .map_err(|err| ExportError::Field(format!("unformattable received_at: {err}")))?;
        let date = e
            .date
            .format(&date_format)
            .map_err(|err| ExportError::Field(format!("unformattable date: {err}")))?;

        writer
            .write_record([
                r.source.clone(),
                received_at,
                fmt_opt_f64(r.voltage),
                fmt_opt_f64(r.current),
                fmt_opt_f64(r.power_factor),
                fmt_opt_f64(r.load_kw),
                fmt_opt_f64(r.kwh),
                fmt_opt_f64(r.frequency),
                fmt_opt_i64(r.retry_count),
                date,
                e.delta_kwh.to_string(),
                e.instant_emission.to_string(),
            ])
            .map_err(|e| ExportError::Csv(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Csv(e.to_string()))
}

fn parse_opt_f64(s: &str) -> Result<Option<f64>, ExportError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    s.parse()
        .map(Some)
        .map_err(|e| ExportError::Field(format!("invalid float '{s}': {e}")))
}

fn parse_opt_i64(s: &str) -> Result<Option<i64>, ExportError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    s.parse()
        .map(Some)
        .map_err(|e| ExportError::Field(format!("invalid integer '{s}': {e}")))
}

/// Re-parse an export produced by [`write_csv`]. Columns are looked up by
/// header name, so column reordering by an intermediate tool is tolerated.
pub fn read_csv(data: &str) -> Result<Vec<EnrichedReading>, ExportError> {
    let date_format = format_description!("[year]-[month]-[day]");

    let mut rdr = csv::Reader::from_reader(data.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| ExportError::Csv(e.to_string()))?
        .clone();

    let get = |record: &StringRecord, name: &str| -> Result<String, ExportError> {
        headers
            .iter()
            .position(|h| h == name)
            .and_then(|idx| record.get(idx))
            .map(str::to_string)
            .ok_or_else(|| ExportError::Field(format!("missing column '{name}' in CSV record")))
    };

    let mut enriched = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| ExportError::Csv(e.to_string()))?;

        let received_at_raw = get(&record, "received_at")?;
        let received_at = OffsetDateTime::parse(received_at_raw.trim(), &Rfc3339)
            .map_err(|e| ExportError::Field(format!("invalid received_at '{received_at_raw}': {e}")))?;

        let date_raw = get(&record, "date")?;
        let date = Date::parse(date_raw.trim(), &date_format)
            .map_err(|e| ExportError::Field(format!("invalid date '{date_raw}': {e}")))?;

        let delta_raw = get(&record, "delta_kwh")?;
        let delta_kwh: f64 = delta_raw
            .trim()
            .parse()
            .map_err(|e| ExportError::Field(format!("invalid delta_kwh '{delta_raw}': {e}")))?;

        let emission_raw = get(&record, "instant_emission")?;
        let instant_emission: f64 = emission_raw.trim().parse().map_err(|e| {
            ExportError::Field(format!("invalid instant_emission '{emission_raw}': {e}"))
        })?;

        enriched.push(EnrichedReading {
            reading: MeterReading {
                source: get(&record, "source")?,
                received_at,
                voltage: parse_opt_f64(&get(&record, "voltage")?)?,
                current: parse_opt_f64(&get(&record, "current")?)?,
                power_factor: parse_opt_f64(&get(&record, "power_factor")?)?,
                load_kw: parse_opt_f64(&get(&record, "load_kw")?)?,
                kwh: parse_opt_f64(&get(&record, "kwh")?)?,
                frequency: parse_opt_f64(&get(&record, "frequency")?)?,
                retry_count: parse_opt_i64(&get(&record, "retry_count")?)?,
            },
            date,
            delta_kwh,
            instant_emission,
        });
    }

    Ok(enriched)
}

/// Download filename in the dashboard's historical convention.
pub fn default_filename(now: OffsetDateTime) -> String {
    format!(
        "smart_meter_data_{:04}{:02}{:02}_{:02}{:02}{:02}.csv",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carbon::enrich;
    use time::macros::datetime;

    fn reading(received_at: OffsetDateTime, kwh: Option<f64>) -> MeterReading {
        MeterReading {
            source: "meter-1".to_string(),
            received_at,
            voltage: Some(230.0),
            current: None,
            power_factor: Some(0.95),
            load_kw: None,
            kwh,
            frequency: Some(50.0),
            retry_count: Some(1),
        }
    }

    #[test]
    fn header_matches_enriched_field_set() {
        let enriched = enrich(&[reading(datetime!(2024-06-01 10:00:00 UTC), Some(10.0))]);
        let csv = write_csv(&enriched).expect("export should succeed");
        let first_line = csv.lines().next().expect("has header");
        assert_eq!(first_line, CSV_HEADER.join(","));
    }

    #[test]
    fn round_trip_preserves_derived_columns() {
        let readings = vec![
            reading(datetime!(2024-06-01 10:00:00 UTC), Some(10.0)),
            reading(datetime!(2024-06-01 10:01:00 UTC), Some(12.0)),
            reading(datetime!(2024-06-01 10:02:00 UTC), Some(3.0)),
            reading(datetime!(2024-06-01 10:03:00 UTC), None),
        ];
        let enriched = enrich(&readings);
        let csv = write_csv(&enriched).expect("export should succeed");
        let parsed = read_csv(&csv).expect("re-parse should succeed");

        assert_eq!(parsed.len(), enriched.len());
        for (a, b) in enriched.iter().zip(&parsed) {
            assert_eq!(a.reading.source, b.reading.source);
            assert_eq!(a.reading.received_at, b.reading.received_at);
            assert_eq!(a.reading.kwh, b.reading.kwh);
            assert_eq!(a.reading.current, b.reading.current);
            assert_eq!(a.date, b.date);
            assert!((a.delta_kwh - b.delta_kwh).abs() < 1e-9);
            assert!((a.instant_emission - b.instant_emission).abs() < 1e-9);
        }
    }

    #[test]
    fn absent_values_round_trip_as_empty_cells() {
        let enriched = enrich(&[reading(datetime!(2024-06-01 10:00:00 UTC), None)]);
        let csv = write_csv(&enriched).expect("export should succeed");
        let parsed = read_csv(&csv).expect("re-parse should succeed");

        assert!(parsed[0].reading.kwh.is_none());
        assert!(parsed[0].reading.current.is_none());
        assert_eq!(parsed[0].reading.retry_count, Some(1));
    }

    #[test]
    fn empty_sequence_exports_header_only() {
        let csv = write_csv(&[]).expect("export should succeed");
        assert_eq!(csv.lines().count(), 1);
        assert!(read_csv(&csv).expect("re-parse should succeed").is_empty());
    }

    #[test]
    fn default_filename_uses_timestamp_convention() {
        let name = default_filename(datetime!(2024-06-01 10:02:03 UTC));
        assert_eq!(name, "smart_meter_data_20240601_100203.csv");
    }
}
