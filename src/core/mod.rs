mod cache;
mod config;
mod context_manager;
mod data_collector;
mod polling_manager;
mod readiness;
mod refresh;
mod retry_gate;

pub use cache::{FlagCache, FlagSnapshot};
pub use config::{
    ExporterMetadataValue, ProviderOptions, ProviderOptionsBuilder,
    DEFAULT_DATA_COLLECTOR_INTERVAL, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_JITTER, DEFAULT_TIMEOUT,
};
pub use context_manager::ContextManager;
pub use data_collector::{
    DataCollector, EventSender, FeatureEvent, FEATURE_EVENT_KIND, PROVIDER_CACHE_SOURCE,
    SDK_DEFAULT_VARIATION,
};
pub use polling_manager::{PollCallback, PollControl, PollingConfig, PollingManager};
pub use readiness::{
    decide, ReadinessTracker, RefreshTrigger, Transition, LIFECYCLE_CHANNEL_CAPACITY,
};
pub use refresh::{RefreshEngine, RefreshOutcome};
pub use retry_gate::{parse_retry_after, RetryGate};
