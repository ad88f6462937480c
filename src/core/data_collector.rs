//! Usage event batching.
//!
//! Evaluations enqueue one `FeatureEvent` each. The buffer is drained and
//! posted as a single batch on a fixed interval and once more at shutdown.
//! Enqueueing never touches the network.

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::error::Result;
use crate::types::EvaluationContext;

pub const FEATURE_EVENT_KIND: &str = "feature";
pub const PROVIDER_CACHE_SOURCE: &str = "PROVIDER_CACHE";
/// Variation reported when the caller's default was served.
pub const SDK_DEFAULT_VARIATION: &str = "SdkDefault";

const USER_CONTEXT_KIND: &str = "user";
const ANONYMOUS_CONTEXT_KIND: &str = "anonymousUser";

/// One flag evaluation, as reported to the data collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureEvent {
    pub kind: String,
    pub context_kind: String,
    pub user_key: String,
    /// Unix time in milliseconds.
    pub creation_date: i64,
    pub key: String,
    pub variation: String,
    pub value: serde_json::Value,
    pub default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub source: String,
}

impl FeatureEvent {
    pub fn new(
        key: impl Into<String>,
        context: &EvaluationContext,
        value: serde_json::Value,
        variation: impl Into<String>,
        default: bool,
    ) -> Self {
        let context_kind = if context.is_anonymous() {
            ANONYMOUS_CONTEXT_KIND
        } else {
            USER_CONTEXT_KIND
        };

        Self {
            kind: FEATURE_EVENT_KIND.to_string(),
            context_kind: context_kind.to_string(),
            user_key: context.targeting_key.clone().unwrap_or_default(),
            creation_date: Utc::now().timestamp_millis(),
            key: key.into(),
            variation: variation.into(),
            value,
            default,
            version: None,
            source: PROVIDER_CACHE_SOURCE.to_string(),
        }
    }

    /// Sets the flag version reported by the server.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Callback type for sending a batch. Resolves to the ingested count.
pub type EventSender = Arc<
    dyn Fn(Vec<FeatureEvent>) -> Pin<Box<dyn Future<Output = Result<usize>> + Send>>
        + Send
        + Sync,
>;

struct FlushTask {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

/// Buffers usage events and flushes them in batches.
///
/// A failed batch is logged and dropped; it is not re-queued.
pub struct DataCollector {
    interval: Duration,
    events: Arc<Mutex<Vec<FeatureEvent>>>,
    sender: EventSender,
    is_running: Arc<AtomicBool>,
    task: Mutex<Option<FlushTask>>,
}

impl DataCollector {
    /// Creates a stopped collector. A zero `interval` never starts a flush task.
    pub fn new(interval: Duration, sender: EventSender) -> Self {
        Self {
            interval,
            events: Arc::new(Mutex::new(Vec::new())),
            sender,
            is_running: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    /// Buffers one event. Never touches the network.
    pub fn enqueue(&self, event: FeatureEvent) {
        self.events.lock().push(event);
    }

    /// Sends everything buffered so far as one batch.
    ///
    /// Returns the number of events the collector ingested, or zero without
    /// any request when the buffer is empty.
    pub async fn flush(&self) -> Result<usize> {
        Self::flush_buffer(&self.events, &self.sender).await
    }

    async fn flush_buffer(
        events: &Mutex<Vec<FeatureEvent>>,
        sender: &EventSender,
    ) -> Result<usize> {
        let batch = std::mem::take(&mut *events.lock());
        if batch.is_empty() {
            return Ok(0);
        }

        let size = batch.len();
        match sender(batch).await {
            Ok(ingested) => {
                tracing::debug!("Flushed {} events ({} ingested)", size, ingested);
                Ok(ingested)
            }
            Err(e) => {
                tracing::warn!("Dropping {} events, collector request failed: {}", size, e);
                Err(e)
            }
        }
    }

    /// Starts the periodic flush task. Does nothing if already running.
    pub fn start(&self) {
        if self.interval.is_zero() {
            return;
        }
        if self.is_running.swap(true, Ordering::SeqCst) {
            return;
        }

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let events = Arc::clone(&self.events);
        let sender = Arc::clone(&self.sender);
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::debug!("Data collector shutting down");
                        let _ = Self::flush_buffer(&events, &sender).await;
                        break;
                    }
                    _ = ticker.tick() => {
                        let _ = Self::flush_buffer(&events, &sender).await;
                    }
                }
            }
        });

        *self.task.lock() = Some(FlushTask {
            shutdown_tx,
            handle,
        });

        tracing::debug!("Data collector started with interval {:?}", interval);
    }

    /// Stops the flush task after one final flush.
    pub async fn stop(&self) {
        let task = self.task.lock().take();
        match task {
            Some(task) => {
                let _ = task.shutdown_tx.send(()).await;
                if let Err(e) = task.handle.await {
                    tracing::warn!("Flush task ended abnormally: {}", e);
                }
            }
            None => {
                let _ = self.flush().await;
            }
        }
        self.is_running.store(false, Ordering::SeqCst);
    }

    /// Number of buffered events.
    pub fn queue_size(&self) -> usize {
        self.events.lock().len()
    }

    /// Copy of the buffered events.
    pub fn queued_events(&self) -> Vec<FeatureEvent> {
        self.events.lock().clone()
    }

    /// Whether the flush task is active.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }
}

impl Drop for DataCollector {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.handle.abort();
        }
    }
}
