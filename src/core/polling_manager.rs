//! Polling manager for background flag refreshes.
//!
//! Runs a callback on a fixed interval until stopped or until the callback
//! asks to stop. The first tick fires one interval (plus jitter) after
//! `start`, never immediately.

use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::config::{DEFAULT_POLL_INTERVAL, DEFAULT_POLL_JITTER};

/// Configuration for the polling manager.
#[derive(Debug, Clone)]
pub struct PollingConfig {
    pub interval: Duration,
    /// Upper bound of the random delay added before the first tick.
    pub jitter: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            jitter: DEFAULT_POLL_JITTER,
        }
    }
}

impl PollingConfig {
    /// Config polling every `interval` with the default jitter.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Sets the maximum random delay added before the first poll.
    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }
}

/// What the poll loop should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollControl {
    /// Keep polling.
    Continue,
    /// End the loop; `is_running` turns false.
    Stop,
}

/// Callback type for poll operations.
pub type PollCallback =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = PollControl> + Send>> + Send + Sync>;

struct PollTask {
    shutdown_tx: mpsc::Sender<()>,
    poll_now_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

/// Manages the background poll loop.
pub struct PollingManager {
    config: PollingConfig,
    is_running: Arc<AtomicBool>,
    task: Mutex<Option<PollTask>>,
}

impl PollingManager {
    /// Creates a stopped manager.
    pub fn new(config: PollingConfig) -> Self {
        Self {
            config,
            is_running: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    /// Interval and jitter in use.
    pub fn config(&self) -> &PollingConfig {
        &self.config
    }

    /// Starts the poll loop. Does nothing if it is already running or the
    /// interval is zero.
    pub fn start(&self, on_poll: PollCallback) {
        if self.config.interval.is_zero() {
            tracing::debug!("Polling disabled");
            return;
        }
        if self.is_running.swap(true, Ordering::SeqCst) {
            return;
        }

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (poll_now_tx, mut poll_now_rx) = mpsc::channel::<()>(10);

        let config = self.config.clone();
        let is_running = Arc::clone(&self.is_running);

        let handle = tokio::spawn(async move {
            let start = Instant::now() + Self::initial_delay(&config);
            let mut ticker = interval_at(start, config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let control = tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::debug!("Polling manager shutting down");
                        break;
                    }
                    Some(()) = poll_now_rx.recv() => {
                        tracing::debug!("Immediate poll requested");
                        on_poll().await
                    }
                    _ = ticker.tick() => on_poll().await,
                };

                if control == PollControl::Stop {
                    tracing::debug!("Poll callback requested stop");
                    break;
                }
            }

            is_running.store(false, Ordering::SeqCst);
        });

        *self.task.lock() = Some(PollTask {
            shutdown_tx,
            poll_now_tx,
            handle,
        });

        tracing::debug!(
            "Polling manager started with interval {:?}",
            self.config.interval
        );
    }

    fn initial_delay(config: &PollingConfig) -> Duration {
        let jitter_ms = (rand::random::<f64>() * config.jitter.as_millis() as f64) as u64;
        config.interval + Duration::from_millis(jitter_ms)
    }

    /// Stops the loop and waits for an in-flight poll to finish.
    pub async fn stop(&self) {
        let task = self.task.lock().take();
        let Some(task) = task else {
            return;
        };

        let _ = task.shutdown_tx.send(()).await;
        if let Err(e) = task.handle.await {
            tracing::warn!("Poll task ended abnormally: {}", e);
        }
        self.is_running.store(false, Ordering::SeqCst);

        tracing::debug!("Polling manager stopped");
    }

    /// Triggers a poll right away without waiting for the next tick.
    pub async fn poll_now(&self) {
        let tx = self.task.lock().as_ref().map(|task| task.poll_now_tx.clone());
        if let Some(tx) = tx {
            let _ = tx.send(()).await;
        }
    }

    /// Whether the poll loop is active.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }
}

impl Drop for PollingManager {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.handle.abort();
        }
        self.is_running.store(false, Ordering::SeqCst);
    }
}
