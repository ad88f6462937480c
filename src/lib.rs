//! OFREP feature flag provider
//!
//! Keeps a local snapshot of flag evaluations fetched in bulk from an OFREP
//! endpoint (such as the GO Feature Flag relay proxy), serves evaluations
//! from it without touching the network, and reports flag usage back to the
//! data collector in batches.
//!
//! # Quick Start
//!
//! ```no_run
//! use ofrep_provider::{EvaluationContext, Provider, ProviderOptions};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> ofrep_provider::Result<()> {
//!     let options = ProviderOptions::builder("http://localhost:1031")
//!         .api_key("my-api-key")
//!         .poll_interval(Duration::from_secs(30))
//!         .build();
//!
//!     let provider = Provider::new(options)?;
//!     let mut events = provider.observe();
//!
//!     provider
//!         .initialize(EvaluationContext::with_targeting_key("user-123"))
//!         .await?;
//!
//!     let dark_mode = provider.get_boolean_evaluation("dark-mode", false);
//!     let theme = provider.get_string_evaluation("theme", "light");
//!     println!("{} {}", dark_mode.value, theme.value);
//!
//!     while let Ok(state) = events.try_recv() {
//!         println!("provider is {}", state);
//!     }
//!
//!     provider.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod error;
pub mod hooks;
pub mod http;
mod provider;
pub mod types;

pub use types::{
    CachedFlag, EvaluationContext, EvaluationDetails, FlagValue, MetadataValue, ReadinessState,
};

pub use error::{ErrorCode, OfrepError, Result};

pub use core::{
    ExporterMetadataValue, FeatureEvent, FlagCache, PollControl, ProviderOptions,
    ProviderOptionsBuilder, RefreshEngine, RefreshOutcome,
};

pub use hooks::{DataCollectorHook, EvaluationHook, HookContext};

pub use http::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

pub use provider::{Provider, ProviderMetadata, PROVIDER_NAME};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
