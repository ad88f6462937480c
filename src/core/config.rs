use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{ErrorCode, OfrepError, Result};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_DATA_COLLECTOR_INTERVAL: Duration = Duration::from_secs(600);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_JITTER: Duration = Duration::from_millis(100);

/// Scalar metadata forwarded to the data collector with every batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExporterMetadataValue {
    String(String),
    Integer(i64),
    Double(f64),
    Bool(bool),
}

impl From<&str> for ExporterMetadataValue {
    fn from(value: &str) -> Self {
        ExporterMetadataValue::String(value.to_string())
    }
}

impl From<String> for ExporterMetadataValue {
    fn from(value: String) -> Self {
        ExporterMetadataValue::String(value)
    }
}

impl From<i64> for ExporterMetadataValue {
    fn from(value: i64) -> Self {
        ExporterMetadataValue::Integer(value)
    }
}

impl From<f64> for ExporterMetadataValue {
    fn from(value: f64) -> Self {
        ExporterMetadataValue::Double(value)
    }
}

impl From<bool> for ExporterMetadataValue {
    fn from(value: bool) -> Self {
        ExporterMetadataValue::Bool(value)
    }
}

#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// Base URL of the relay proxy or OFREP server.
    pub endpoint: String,
    /// Zero disables polling.
    pub poll_interval: Duration,
    pub poll_jitter: Duration,
    /// Sent as `Authorization: Bearer <key>`.
    pub api_key: Option<String>,
    pub headers: HashMap<String, String>,
    /// Zero disables usage collection entirely.
    pub data_collector_interval: Duration,
    pub exporter_metadata: HashMap<String, ExporterMetadataValue>,
    pub timeout: Duration,
}

impl ProviderOptions {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_jitter: DEFAULT_POLL_JITTER,
            api_key: None,
            headers: HashMap::new(),
            data_collector_interval: DEFAULT_DATA_COLLECTOR_INTERVAL,
            exporter_metadata: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn builder(endpoint: impl Into<String>) -> ProviderOptionsBuilder {
        ProviderOptionsBuilder::new(endpoint)
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.endpoint).map_err(|e| {
            OfrepError::with_source(
                ErrorCode::ConfigInvalidEndpoint,
                format!("endpoint [{}] is not valid", self.endpoint),
                e,
            )
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(OfrepError::config_error(
                ErrorCode::ConfigInvalidEndpoint,
                format!("endpoint [{}] must use http or https", self.endpoint),
            ));
        }

        Ok(())
    }

    pub fn polling_enabled(&self) -> bool {
        !self.poll_interval.is_zero()
    }

    pub fn data_collection_enabled(&self) -> bool {
        !self.data_collector_interval.is_zero()
    }

    /// Joins `path` onto the endpoint, tolerating a trailing slash on either side.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Custom headers plus the bearer token, if any.
    pub fn request_headers(&self) -> Vec<(String, String)> {
        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(ref api_key) = self.api_key {
            headers.push(("Authorization".to_string(), format!("Bearer {}", api_key)));
        }
        headers
    }
}

pub struct ProviderOptionsBuilder {
    options: ProviderOptions,
}

impl ProviderOptionsBuilder {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            options: ProviderOptions::new(endpoint),
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.options.poll_interval = interval;
        self
    }

    pub fn poll_jitter(mut self, jitter: Duration) -> Self {
        self.options.poll_jitter = jitter;
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.options.api_key = Some(api_key.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.headers.insert(name.into(), value.into());
        self
    }

    pub fn data_collector_interval(mut self, interval: Duration) -> Self {
        self.options.data_collector_interval = interval;
        self
    }

    pub fn exporter_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<ExporterMetadataValue>,
    ) -> Self {
        self.options.exporter_metadata.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    pub fn build(self) -> ProviderOptions {
        self.options
    }
}
