//! The caller-facing provider.
//!
//! Wires the refresh engine, readiness tracking, polling and usage
//! collection together. Evaluations are served synchronously from the flag
//! cache and never wait on the network.

use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, Mutex};

use crate::core::{
    decide, ContextManager, DataCollector, EventSender, FeatureEvent, FlagCache, PollCallback,
    PollControl, PollingConfig, PollingManager, ProviderOptions, ReadinessTracker, RefreshEngine,
    RefreshOutcome, RefreshTrigger,
};
use crate::error::{ErrorCode, OfrepError, Result};
use crate::hooks::{DataCollectorHook, EvaluationHook, HookContext};
use crate::http::{CollectorApi, OfrepApi, ReqwestTransport, Transport};
use crate::types::{CachedFlag, EvaluationContext, EvaluationDetails, FlagValue, ReadinessState};

pub const PROVIDER_NAME: &str = "GO Feature Flag provider";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMetadata {
    pub name: String,
}

struct ProviderInner {
    options: ProviderOptions,
    engine: RefreshEngine,
    readiness: ReadinessTracker,
    context: ContextManager,
    poller: PollingManager,
    collector: Option<Arc<DataCollector>>,
    hooks: Vec<Arc<dyn EvaluationHook>>,
    /// Held from the start of a refresh until its transition is applied.
    lifecycle: Mutex<()>,
}

impl ProviderInner {
    async fn run_cycle(
        &self,
        trigger: RefreshTrigger,
        context: &EvaluationContext,
    ) -> Result<RefreshOutcome> {
        let _lifecycle = self.lifecycle.lock().await;
        self.run_cycle_locked(trigger, context).await
    }

    /// Caller must hold `lifecycle`.
    async fn run_cycle_locked(
        &self,
        trigger: RefreshTrigger,
        context: &EvaluationContext,
    ) -> Result<RefreshOutcome> {
        if self.readiness.is_fatal() {
            return Err(fatal_error());
        }

        let outcome = self.engine.refresh(context).await;
        let transition = decide(trigger, self.readiness.status(), &outcome);
        self.readiness.apply(transition);
        outcome
    }

    async fn poll(&self) -> PollControl {
        if self.readiness.is_fatal() {
            return PollControl::Stop;
        }

        {
            let _lifecycle = self.lifecycle.lock().await;
            // Read under the lock so a context change that won the race is honoured.
            let context = self.context.get();
            // Failures are already reflected in the readiness state.
            let _ = self.run_cycle_locked(RefreshTrigger::Poll, &context).await;
        }

        if self.readiness.is_fatal() {
            PollControl::Stop
        } else {
            PollControl::Continue
        }
    }
}

fn fatal_error() -> OfrepError {
    OfrepError::new(
        ErrorCode::ProviderFatal,
        "Provider is in a fatal state and no longer refreshes",
    )
}

/// Remote flag evaluation provider backed by an OFREP endpoint.
///
/// # Example
///
/// ```no_run
/// use ofrep_provider::{EvaluationContext, Provider, ProviderOptions};
///
/// # async fn run() -> ofrep_provider::Result<()> {
/// let provider = Provider::new(ProviderOptions::new("http://localhost:1031"))?;
/// provider
///     .initialize(EvaluationContext::with_targeting_key("user-123"))
///     .await?;
///
/// let details = provider.get_boolean_evaluation("my-flag", false);
/// println!("my-flag = {}", details.value);
///
/// provider.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct Provider {
    inner: Arc<ProviderInner>,
}

impl Provider {
    /// Builds a provider that talks to `options.endpoint` over HTTP.
    ///
    /// Fails with `ConfigInvalidEndpoint` if the endpoint is not an http(s) URL.
    pub fn new(options: ProviderOptions) -> Result<Self> {
        options.validate()?;
        let transport = ReqwestTransport::new(options.timeout)?;
        Self::with_transport(options, Arc::new(transport))
    }

    /// Builds a provider on a caller-supplied transport.
    pub fn with_transport(options: ProviderOptions, transport: Arc<dyn Transport>) -> Result<Self> {
        options.validate()?;

        let api = OfrepApi::new(Arc::clone(&transport), &options);
        let engine = RefreshEngine::new(api, FlagCache::new());

        let poller = PollingManager::new(
            PollingConfig::new(options.poll_interval).jitter(options.poll_jitter),
        );

        let mut hooks: Vec<Arc<dyn EvaluationHook>> = Vec::new();
        let collector = if options.data_collection_enabled() {
            let collector_api = Arc::new(CollectorApi::new(transport, &options));
            let sender: EventSender = Arc::new(move |events: Vec<FeatureEvent>| {
                let api = Arc::clone(&collector_api);
                Box::pin(async move { api.post_data_collector(&events).await })
            });
            let collector = Arc::new(DataCollector::new(options.data_collector_interval, sender));
            hooks.push(Arc::new(DataCollectorHook::new(Arc::clone(&collector))));
            Some(collector)
        } else {
            None
        };

        let provider = Self {
            inner: Arc::new(ProviderInner {
                options,
                engine,
                readiness: ReadinessTracker::new(),
                context: ContextManager::new(),
                poller,
                collector,
                hooks,
                lifecycle: Mutex::new(()),
            }),
        };

        // Outside a runtime the flush task starts with `initialize` instead.
        if tokio::runtime::Handle::try_current().is_ok() {
            provider.start_collector();
        }

        Ok(provider)
    }

    /// Provider name as reported to the caller.
    pub fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: PROVIDER_NAME.to_string(),
        }
    }

    /// Options the provider was built with.
    pub fn options(&self) -> &ProviderOptions {
        &self.inner.options
    }

    /// Current readiness.
    pub fn status(&self) -> ReadinessState {
        self.inner.readiness.status()
    }

    /// Subscribes to lifecycle transitions from now on.
    pub fn observe(&self) -> broadcast::Receiver<ReadinessState> {
        self.inner.readiness.subscribe()
    }

    /// Hooks attached to every evaluation. Empty when usage collection is off.
    pub fn hooks(&self) -> &[Arc<dyn EvaluationHook>] {
        &self.inner.hooks
    }

    /// Context used by the next refresh.
    pub fn context(&self) -> EvaluationContext {
        self.inner.context.get()
    }

    /// Performs the first refresh and starts background polling.
    ///
    /// Succeeds only if flags were fetched. Polling is started even after a
    /// recoverable failure so the provider can become ready later. The usage
    /// flush task is started here if construction happened outside a runtime.
    pub async fn initialize(&self, context: EvaluationContext) -> Result<()> {
        self.start_collector();
        self.inner.context.set(context.clone());
        let outcome = self
            .inner
            .run_cycle(RefreshTrigger::Initialize, &context)
            .await;

        if !self.inner.readiness.is_fatal() {
            self.start_polling();
        }

        match outcome {
            Ok(RefreshOutcome::Updated) => {
                tracing::debug!("Provider initialized");
                Ok(())
            }
            Ok(other) => Err(OfrepError::new(
                ErrorCode::ProviderNotReady,
                format!("Initial refresh returned no flags ({:?})", other),
            )),
            Err(e) => {
                tracing::warn!("Provider initialization failed: {}", e);
                Err(e)
            }
        }
    }

    /// Usage events keep flowing whatever the readiness, so the flush task
    /// runs from construction until `shutdown`.
    fn start_collector(&self) {
        if let Some(ref collector) = self.inner.collector {
            collector.start();
        }
    }

    fn start_polling(&self) {
        if self.inner.options.polling_enabled() {
            let weak: Weak<ProviderInner> = Arc::downgrade(&self.inner);
            let on_poll: PollCallback = Arc::new(move || {
                let weak = weak.clone();
                Box::pin(async move {
                    match weak.upgrade() {
                        Some(inner) => inner.poll().await,
                        None => PollControl::Stop,
                    }
                })
            });
            self.inner.poller.start(on_poll);
        }
    }

    /// Refreshes flags for a new evaluation context.
    ///
    /// The provider reports `Stale` while the refresh is in flight. An
    /// in-flight poll finishes before the context is swapped, so `Ready` is
    /// only reported once the cache matches the new context. A
    /// rate-limited refresh is not an error; the provider stays `Stale`
    /// until a later poll succeeds.
    pub async fn on_context_changed(
        &self,
        old: Option<&EvaluationContext>,
        new: EvaluationContext,
    ) -> Result<()> {
        if self.inner.readiness.is_fatal() {
            tracing::debug!("Ignoring context change, provider is fatal");
            return Err(fatal_error());
        }
        if old == Some(&new) {
            return Ok(());
        }

        let _lifecycle = self.inner.lifecycle.lock().await;
        if self.inner.readiness.is_fatal() {
            return Err(fatal_error());
        }

        self.inner.context.set(new.clone());
        self.inner.readiness.transition(ReadinessState::Stale);

        match self
            .inner
            .run_cycle_locked(RefreshTrigger::ContextChange, &new)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.code == ErrorCode::RateLimited => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Looks up the cached evaluation for `key`.
    ///
    /// Fails with `ProviderNotReady` before the first successful refresh and
    /// after a fatal error. A flag the server evaluated with an error
    /// surfaces that error.
    pub fn lookup(&self, key: &str) -> Result<CachedFlag> {
        if !self.status().can_serve() {
            return Err(OfrepError::not_ready());
        }

        let flag = self
            .inner
            .engine
            .cache()
            .lookup(key)
            .ok_or_else(|| OfrepError::flag_not_found(key))?;

        if let Some(code) = flag.error_code {
            return Err(OfrepError::from_remote(code, flag.error_details.as_deref()));
        }

        Ok(flag)
    }

    /// Evaluates a boolean flag, falling back to `default_value` on any error.
    pub fn get_boolean_evaluation(&self, key: &str, default_value: bool) -> EvaluationDetails<bool> {
        self.evaluate(key, default_value, FlagValue::as_bool)
    }

    /// Evaluates a string flag.
    pub fn get_string_evaluation(&self, key: &str, default_value: &str) -> EvaluationDetails<String> {
        self.evaluate(key, default_value.to_string(), |value| {
            value.as_str().map(str::to_string)
        })
    }

    /// Evaluates an integer flag. Doubles are a type mismatch.
    pub fn get_integer_evaluation(&self, key: &str, default_value: i64) -> EvaluationDetails<i64> {
        self.evaluate(key, default_value, FlagValue::as_integer)
    }

    /// Evaluates a number flag. Integers are widened.
    pub fn get_double_evaluation(&self, key: &str, default_value: f64) -> EvaluationDetails<f64> {
        self.evaluate(key, default_value, FlagValue::as_double)
    }

    /// Structured flags: maps and lists are accepted, scalars are a type mismatch.
    pub fn get_object_evaluation(
        &self,
        key: &str,
        default_value: FlagValue,
    ) -> EvaluationDetails<FlagValue> {
        self.evaluate(key, default_value, |value| match value {
            FlagValue::Map(_) | FlagValue::List(_) => Some(value.clone()),
            _ => None,
        })
    }

    fn evaluate<T>(
        &self,
        key: &str,
        default_value: T,
        convert: impl Fn(&FlagValue) -> Option<T>,
    ) -> EvaluationDetails<T>
    where
        T: Clone + Into<FlagValue>,
    {
        let resolved = self.lookup(key).and_then(|flag| match convert(&flag.value) {
            Some(value) => Ok(EvaluationDetails::from_flag(&flag, value)),
            None => Err(OfrepError::type_mismatch(key)),
        });

        let hook_context = (!self.inner.hooks.is_empty()).then(|| HookContext {
            flag_key: key.to_string(),
            default_value: default_value.clone().into(),
            context: self.inner.context.get(),
        });

        match resolved {
            Ok(details) => {
                if let Some(ref ctx) = hook_context {
                    let generic: EvaluationDetails<FlagValue> = details.clone().map(Into::into);
                    for hook in &self.inner.hooks {
                        hook.after(ctx, &generic);
                    }
                }
                details
            }
            Err(error) => {
                tracing::debug!("Serving default for {}: {}", key, error);
                if let Some(ref ctx) = hook_context {
                    for hook in &self.inner.hooks {
                        hook.error(ctx, &error);
                    }
                }
                EvaluationDetails::default_result(key, default_value, &error)
            }
        }
    }

    /// Sends buffered usage events now. Returns the ingested count.
    pub async fn flush_events(&self) -> Result<usize> {
        match self.inner.collector {
            Some(ref collector) => collector.flush().await,
            None => Ok(0),
        }
    }

    /// Number of usage events waiting for the next flush.
    pub fn pending_events(&self) -> usize {
        self.inner
            .collector
            .as_ref()
            .map_or(0, |collector| collector.queue_size())
    }

    /// Whether the poll task is running.
    pub fn is_polling(&self) -> bool {
        self.inner.poller.is_running()
    }

    /// Stops polling and flushes remaining usage events.
    pub async fn shutdown(&self) {
        self.inner.poller.stop().await;
        if let Some(ref collector) = self.inner.collector {
            collector.stop().await;
        }
        tracing::debug!("Provider shut down");
    }
}
