//! One refresh cycle: gate check, bulk fetch, cache replace.

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::cache::FlagCache;
use super::retry_gate::RetryGate;
use crate::error::{ErrorCode, Result};
use crate::http::{BulkEvaluation, OfrepApi};
use crate::types::EvaluationContext;

/// Non-error result of a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Skipped by the retry gate; no request was sent.
    RateLimited,
    /// The server answered 304; the cache was left as is.
    NotModified,
    /// A new snapshot was installed.
    Updated,
}

/// Fetches the bulk evaluation and keeps the flag cache in sync with it.
///
/// Cycles never overlap: each one holds `cycle` from the gate check until
/// the cache has been updated.
pub struct RefreshEngine {
    api: OfrepApi,
    cache: FlagCache,
    gate: RetryGate,
    cycle: Mutex<()>,
}

impl RefreshEngine {
    /// Creates an engine that writes into `cache`. The retry gate starts open.
    pub fn new(api: OfrepApi, cache: FlagCache) -> Self {
        Self {
            api,
            cache,
            gate: RetryGate::new(),
            cycle: Mutex::new(()),
        }
    }

    /// Cache updated by successful cycles.
    pub fn cache(&self) -> &FlagCache {
        &self.cache
    }

    /// Gate set from the last 429.
    pub fn gate(&self) -> &RetryGate {
        &self.gate
    }

    /// Underlying bulk evaluation client.
    pub fn api(&self) -> &OfrepApi {
        &self.api
    }

    /// Runs one cycle against the wall clock.
    pub async fn refresh(&self, context: &EvaluationContext) -> Result<RefreshOutcome> {
        self.refresh_at(context, Utc::now()).await
    }

    /// Runs a cycle, checking the retry gate against `now`.
    pub async fn refresh_at(
        &self,
        context: &EvaluationContext,
        now: DateTime<Utc>,
    ) -> Result<RefreshOutcome> {
        let _cycle = self.cycle.lock().await;

        if self.gate.is_active_at(now) {
            tracing::debug!("Refresh skipped, rate limited until {:?}", self.gate.until());
            return Ok(RefreshOutcome::RateLimited);
        }

        match self.api.post_bulk_evaluate_flags(context).await {
            Ok(BulkEvaluation::NotModified) => {
                tracing::debug!("Flags not modified");
                Ok(RefreshOutcome::NotModified)
            }
            Ok(BulkEvaluation::Modified(response)) => {
                if let Some(error) = response.error() {
                    return Err(error);
                }

                let snapshot = response.into_snapshot();
                tracing::debug!("Refreshed {} flags", snapshot.len());
                self.cache.replace(snapshot);
                Ok(RefreshOutcome::Updated)
            }
            Err(error) => {
                if error.code == ErrorCode::RateLimited {
                    self.gate.set(error.retry_after);
                }
                tracing::warn!("Flag refresh failed: {}", error);
                Err(error)
            }
        }
    }
}
