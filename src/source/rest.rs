//! Telemetry Table REST Client
//!
//! HTTP client for the hosted telemetry table. Speaks the PostgREST dialect
//! exposed by the table service:
//!
//! - `GET  {url}/rest/v1/{table}?select=*&order=created_at.desc&limit=N`
//! - `GET  {url}/rest/v1/{table}?select=*&created_at=gt.{ts}&order=created_at.asc`
//! - `POST {url}/rest/v1/{table}`

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

use super::{HistorySource, IncrementalSource, ReadingSink, SourceError, SourceResult};
use crate::monitor::Reading;

/// Connection settings for the telemetry table service
#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
    /// Base URL of the table service (e.g., "https://project.example.co")
    #[serde(default)]
    pub url: String,

    /// API key sent as `apikey` and bearer token
    #[serde(default)]
    pub api_key: String,

    /// Table holding telemetry rows
    #[serde(default = "default_table_name")]
    pub name: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Live feed polling interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_table_name() -> String {
    "telemetry".to_string()
}

fn default_request_timeout() -> u64 {
    5000
}

fn default_poll_interval() -> u64 {
    1000
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            name: default_table_name(),
            request_timeout_ms: default_request_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl TableConfig {
    /// Whether a remote table has been configured
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// REST client for the telemetry table
pub struct RestTable {
    client: Client,
    config: TableConfig,
}

impl RestTable {
    /// Create a new client with the given configuration
    pub fn new(config: TableConfig) -> SourceResult<Self> {
        if !config.is_configured() {
            return Err(SourceError::Config("table url is not set".to_string()));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Endpoint for the configured table
    fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.url.trim_end_matches('/'),
            self.config.name
        )
    }

    /// Attach authentication headers
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    /// Run a row query and decode the result
    async fn query_rows(&self, params: &[(&str, String)]) -> SourceResult<Vec<Reading>> {
        let response = self
            .authorize(self.client.get(self.table_url()))
            .query(params)
            .send()
            .await
            .map_err(SourceError::from_request)?;

        let response = check_status(response).await?;
        let body = response.text().await.map_err(SourceError::from_request)?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Turn a non-success response into an API error
async fn check_status(response: Response) -> SourceResult<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        Err(SourceError::Api {
            status: status.as_u16(),
            message: text,
        })
    }
}

/// Row body for inserts; `created_at` is left to the table service
#[derive(Debug, Serialize)]
struct NewRow {
    temperature: f64,
    vibration: f64,
    is_anomaly: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    anomaly_score: Option<f64>,
}

impl From<&Reading> for NewRow {
    fn from(reading: &Reading) -> Self {
        Self {
            temperature: reading.temperature,
            vibration: reading.vibration,
            is_anomaly: reading.is_anomaly,
            anomaly_score: reading.anomaly_score,
        }
    }
}

/// Timestamp format accepted by the `gt.` filter
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl HistorySource for RestTable {
    async fn fetch_recent(&self, limit: usize) -> SourceResult<Vec<Reading>> {
        let params = [
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", limit.to_string()),
        ];
        self.query_rows(&params).await
    }
}

#[async_trait]
impl IncrementalSource for RestTable {
    async fn fetch_since(&self, since: DateTime<Utc>) -> SourceResult<Vec<Reading>> {
        let params = [
            ("select", "*".to_string()),
            ("created_at", format!("gt.{}", format_timestamp(since))),
            ("order", "created_at.asc".to_string()),
        ];
        self.query_rows(&params).await
    }
}

#[async_trait]
impl ReadingSink for RestTable {
    async fn insert(&self, reading: &Reading) -> SourceResult<()> {
        let response = self
            .authorize(self.client.post(self.table_url()))
            .header("Prefer", "return=minimal")
            .json(&NewRow::from(reading))
            .send()
            .await
            .map_err(SourceError::from_request)?;

        check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config(url: &str) -> TableConfig {
        TableConfig {
            url: url.to_string(),
            api_key: "anon-key".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = TableConfig::default();
        assert_eq!(config.name, "telemetry");
        assert_eq!(config.request_timeout_ms, 5000);
        assert_eq!(config.poll_interval_ms, 1000);
        assert!(!config.is_configured());
    }

    #[test]
    fn test_new_requires_url() {
        let result = RestTable::new(TableConfig::default());
        assert!(matches!(result, Err(SourceError::Config(_))));
    }

    #[test]
    fn test_table_url_trims_trailing_slash() {
        let table = RestTable::new(config("https://project.example.co/")).unwrap();
        assert_eq!(
            table.table_url(),
            "https://project.example.co/rest/v1/telemetry"
        );
    }

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(format_timestamp(ts), "2024-05-01T12:00:00.000000Z");
    }

    #[test]
    fn test_insert_body_leaves_timestamp_to_service() {
        let reading = Reading::new(45.12, 0.21, true).score(3.4);
        let body = serde_json::to_value(NewRow::from(&reading)).unwrap();

        assert!(body.get("created_at").is_none());
        assert_eq!(body["temperature"], 45.12);
        assert_eq!(body["is_anomaly"], true);
        assert_eq!(body["anomaly_score"], 3.4);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        // Port 9 (discard) on localhost is not expected to accept connections
        let table = RestTable::new(config("http://127.0.0.1:9")).unwrap();
        let result = table.fetch_recent(20).await;
        assert!(matches!(
            result,
            Err(SourceError::Unavailable) | Err(SourceError::Timeout)
        ));
    }
}
