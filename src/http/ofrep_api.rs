//! Bulk evaluation against an OFREP endpoint.

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use super::client::{status_to_error, HttpRequest, HttpResponse, Transport};
use crate::core::{parse_retry_after, ProviderOptions};
use crate::error::{ErrorCode, OfrepError, Result};
use crate::types::{CachedFlag, EvaluationContext, FlagValue, MetadataValue};

pub const BULK_EVALUATION_PATH: &str = "ofrep/v1/evaluate/flags";

#[derive(Debug, Serialize)]
pub struct BulkEvaluationRequest<'a> {
    pub context: &'a EvaluationContext,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEvaluationResponse {
    #[serde(default)]
    pub flags: Vec<EvaluationResponseFlag>,
    pub error_code: Option<String>,
    pub error_details: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResponseFlag {
    pub key: Option<String>,
    #[serde(default)]
    pub value: serde_json::Value,
    pub reason: Option<String>,
    pub variant: Option<String>,
    pub error_code: Option<String>,
    pub error_details: Option<String>,
    pub metadata: Option<HashMap<String, MetadataValue>>,
}

impl EvaluationResponseFlag {
    /// Converts the wire entry to a cache entry. Entries without a key yield `None`.
    pub fn into_cached(self) -> Option<CachedFlag> {
        let key = self.key?;
        Some(CachedFlag {
            key,
            value: FlagValue::from(self.value),
            variant: self.variant,
            reason: self.reason,
            error_code: self.error_code.as_deref().map(ErrorCode::from_remote),
            error_details: self.error_details,
            metadata: self.metadata.unwrap_or_default(),
        })
    }
}

impl BulkEvaluationResponse {
    pub fn is_error(&self) -> bool {
        self.error_code.is_some()
    }

    /// The payload-level error, if the server reported one.
    pub fn error(&self) -> Option<OfrepError> {
        self.error_code.as_deref().map(|code| {
            OfrepError::from_remote(ErrorCode::from_remote(code), self.error_details.as_deref())
        })
    }

    pub fn into_snapshot(self) -> HashMap<String, CachedFlag> {
        self.flags
            .into_iter()
            .filter_map(EvaluationResponseFlag::into_cached)
            .map(|flag| (flag.key.clone(), flag))
            .collect()
    }
}

/// What a bulk evaluation call produced.
#[derive(Debug)]
pub enum BulkEvaluation {
    Modified(BulkEvaluationResponse),
    NotModified,
}

/// Client for the OFREP bulk evaluation endpoint.
///
/// Remembers the last `ETag` and sends it back as `If-None-Match`.
pub struct OfrepApi {
    transport: Arc<dyn Transport>,
    url: String,
    headers: Vec<(String, String)>,
    etag: Mutex<Option<String>>,
}

impl OfrepApi {
    /// Creates a client for `{endpoint}/ofrep/v1/evaluate/flags`.
    pub fn new(transport: Arc<dyn Transport>, options: &ProviderOptions) -> Self {
        Self {
            transport,
            url: options.endpoint_url(BULK_EVALUATION_PATH),
            headers: options.request_headers(),
            etag: Mutex::new(None),
        }
    }

    /// ETag of the last successful evaluation.
    pub fn etag(&self) -> Option<String> {
        self.etag.lock().clone()
    }

    /// Evaluates every flag for `context`.
    ///
    /// Returns `NotModified` when the server confirms the stored ETag.
    pub async fn post_bulk_evaluate_flags(
        &self,
        context: &EvaluationContext,
    ) -> Result<BulkEvaluation> {
        let body = serde_json::to_vec(&BulkEvaluationRequest { context }).map_err(|e| {
            OfrepError::with_source(ErrorCode::InvalidContext, "Failed to encode context", e)
        })?;

        let mut request = HttpRequest::post(&self.url);
        for (name, value) in &self.headers {
            request = request.header(name.clone(), value.clone());
        }
        if let Some(etag) = self.etag() {
            request = request.header("If-None-Match", etag);
        }
        let request = request.json_body(body);

        let response = self.transport.execute(request).await?;
        self.handle_response(response)
    }

    fn handle_response(&self, response: HttpResponse) -> Result<BulkEvaluation> {
        match response.status {
            304 => Ok(BulkEvaluation::NotModified),
            429 => {
                let retry_after = response
                    .header("Retry-After")
                    .and_then(|value| parse_retry_after(value, Utc::now()));
                Err(OfrepError::rate_limited(retry_after))
            }
            status if status >= 400 => Err(status_to_error(status, &response.body)),
            _ => {
                let decoded: BulkEvaluationResponse = serde_json::from_slice(&response.body)
                    .map_err(|e| {
                        OfrepError::with_source(
                            ErrorCode::InvalidResponse,
                            format!("Failed to parse response: {}", e),
                            e,
                        )
                    })?;

                // An error payload must not become the revalidation baseline.
                if !decoded.is_error() {
                    if let Some(etag) = response.header("ETag") {
                        *self.etag.lock() = Some(etag.to_string());
                    }
                }

                Ok(BulkEvaluation::Modified(decoded))
            }
        }
    }
}
