//! Usage event submission to the GO Feature Flag data collector.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use super::client::{HttpRequest, Transport};
use crate::core::{ExporterMetadataValue, FeatureEvent, ProviderOptions};
use crate::error::{ErrorCode, OfrepError, Result};

pub const DATA_COLLECTOR_PATH: &str = "v1/data/collector";

/// Value of `meta.provider` on every collector request.
pub const PROVIDER_METADATA: &str = "openfeature-rust";

#[derive(Debug, Serialize)]
pub struct DataCollectorRequest<'a> {
    pub meta: &'a HashMap<String, ExporterMetadataValue>,
    pub events: &'a [FeatureEvent],
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataCollectorResponse {
    #[serde(default)]
    pub ingested_content_count: usize,
}

pub struct CollectorApi {
    transport: Arc<dyn Transport>,
    url: String,
    headers: Vec<(String, String)>,
    meta: HashMap<String, ExporterMetadataValue>,
}

impl CollectorApi {
    /// Creates a client for `{endpoint}/v1/data/collector`, tagging requests
    /// with the exporter metadata.
    pub fn new(transport: Arc<dyn Transport>, options: &ProviderOptions) -> Self {
        let mut meta = options.exporter_metadata.clone();
        meta.insert(
            "provider".to_string(),
            ExporterMetadataValue::String(PROVIDER_METADATA.to_string()),
        );

        Self {
            transport,
            url: options.endpoint_url(DATA_COLLECTOR_PATH),
            headers: options.request_headers(),
            meta,
        }
    }

    /// The `meta` object sent with every batch.
    pub fn meta(&self) -> &HashMap<String, ExporterMetadataValue> {
        &self.meta
    }

    /// Posts one batch and returns the number of events the collector ingested.
    pub async fn post_data_collector(&self, events: &[FeatureEvent]) -> Result<usize> {
        if events.is_empty() {
            return Err(OfrepError::new(ErrorCode::NoEventToSend, "No event to send"));
        }

        let body = serde_json::to_vec(&DataCollectorRequest {
            meta: &self.meta,
            events,
        })
        .map_err(|e| {
            OfrepError::with_source(ErrorCode::InvalidResponse, "Failed to encode events", e)
        })?;

        let mut request = HttpRequest::post(&self.url);
        for (name, value) in &self.headers {
            request = request.header(name.clone(), value.clone());
        }
        let response = self.transport.execute(request.json_body(body)).await?;

        match response.status {
            401 => Err(OfrepError::network_error(
                ErrorCode::Unauthorized,
                "Data collector rejected the API key",
            )),
            403 => Err(OfrepError::network_error(
                ErrorCode::Forbidden,
                "Data collector access forbidden",
            )),
            status if status >= 400 => Err(OfrepError::network_error(
                ErrorCode::UnexpectedStatus,
                format!("Data collector returned status {}", status),
            )),
            _ if response.body.is_empty() => Ok(events.len()),
            _ => {
                let decoded: DataCollectorResponse = serde_json::from_slice(&response.body)
                    .map_err(|e| {
                        OfrepError::with_source(
                            ErrorCode::InvalidResponse,
                            format!("Failed to parse collector response: {}", e),
                            e,
                        )
                    })?;
                Ok(decoded.ingested_content_count)
            }
        }
    }
}
