use std::time::Duration;

use meter_client::db::StoreStats;
use meter_client::domain::MeterReading;
use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use super::{ReadingProvider, StoreError};

/// Primary provider: the remote ingestion API.
///
/// Queries `GET {base}/api/data?source=&limit=` with a bounded timeout and
/// expects a `{status: "success", data: [...]}` envelope. Any transport
/// error, non-success status, or empty payload is an error so the store
/// falls back to the secondary provider.
pub struct HttpApiProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct DataEnvelope {
    status: String,
    #[serde(default)]
    data: Vec<IncomingReading>,
}

#[derive(Deserialize)]
struct IncomingReading {
    source: String,
    received_at: String,
    voltage: Option<f64>,
    current: Option<f64>,
    power_factor: Option<f64>,
    load_kw: Option<f64>,
    kwh: Option<f64>,
    frequency: Option<f64>,
    retry_count: Option<i64>,
}

#[derive(Deserialize)]
struct StatsEnvelope {
    #[serde(default)]
    statistics: StatsPayload,
}

#[derive(Deserialize, Default)]
struct StatsPayload {
    #[serde(default)]
    total_readings: i64,
    #[serde(default)]
    last_24h_readings: i64,
    #[serde(default)]
    database_size_mb: f64,
    #[serde(default)]
    latest_timestamp: Option<String>,
}

/// RFC 3339 first; SQLite-style `YYYY-MM-DD HH:MM:SS` timestamps come
/// through without an offset and are taken as UTC.
fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, StoreError> {
    let raw = raw.trim();
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(ts);
    }

    let sqlite_format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    PrimitiveDateTime::parse(raw, sqlite_format)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|e| StoreError::Decode(format!("invalid received_at '{raw}': {e}")))
}

impl TryFrom<IncomingReading> for MeterReading {
    type Error = StoreError;

    fn try_from(i: IncomingReading) -> Result<Self, StoreError> {
        if i.source.is_empty() {
            return Err(StoreError::Decode("reading with empty source".to_string()));
        }

        Ok(MeterReading {
            received_at: parse_timestamp(&i.received_at)?,
            source: i.source,
            voltage: i.voltage,
            current: i.current,
            power_factor: i.power_factor,
            load_kw: i.load_kw,
            kwh: i.kwh,
            frequency: i.frequency,
            retry_count: i.retry_count,
        })
    }
}

impl HttpApiProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Http(e.to_string()))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, StoreError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Http(format!(
                "unexpected status {} from {path}",
                response.status()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl ReadingProvider for HttpApiProvider {
    fn name(&self) -> &str {
        "http-api"
    }

    async fn fetch_readings(
        &self,
        source_filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MeterReading>, StoreError> {
        let mut request = self
            .client
            .get(format!("{}/api/data", self.base_url))
            .query(&[("limit", limit.to_string())]);
        if let Some(source) = source_filter {
            request = request.query(&[("source", source)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(StoreError::Http(format!(
                "unexpected status {} from /api/data",
                response.status()
            )));
        }

        let envelope: DataEnvelope = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        if envelope.status != "success" {
            return Err(StoreError::Http(format!(
                "api reported status '{}'",
                envelope.status
            )));
        }

        let readings = envelope
            .data
            .into_iter()
            .map(MeterReading::try_from)
            .collect::<Result<Vec<_>, _>>();
        if readings.is_err() {
            metrics::counter!("http_api_decode_errors_total").increment(1);
        }
        readings
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        // Probe liveness first; statistics from a dead service are stale.
        let health = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        if !health.status().is_success() {
            return Err(StoreError::Http(format!(
                "health probe returned {}",
                health.status()
            )));
        }

        let envelope: StatsEnvelope = self.get_json("/api/stats").await?;
        let s = envelope.statistics;

        let latest_timestamp = match s.latest_timestamp.as_deref() {
            Some(raw) => match parse_timestamp(raw) {
                Ok(ts) => Some(ts),
                Err(e) => {
                    tracing::debug!(error = %e, "ignoring unparseable latest_timestamp");
                    None
                }
            },
            None => None,
        };

        Ok(StoreStats {
            total_readings: s.total_readings,
            last_24h_readings: s.last_24h_readings,
            database_size_mb: s.database_size_mb,
            latest_timestamp,
        })
    }
}
