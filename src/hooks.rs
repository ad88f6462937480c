//! Evaluation hooks.
//!
//! Hooks observe every evaluation served by the provider. The provider
//! attaches a [`DataCollectorHook`] when usage collection is enabled, which
//! turns each evaluation into a [`FeatureEvent`] for the data collector.

use std::sync::Arc;

use crate::core::{DataCollector, FeatureEvent, SDK_DEFAULT_VARIATION};
use crate::error::OfrepError;
use crate::types::{EvaluationContext, EvaluationDetails, FlagValue};

/// What a hook knows about the evaluation in progress.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub flag_key: String,
    pub default_value: FlagValue,
    pub context: EvaluationContext,
}

/// Observes evaluations after they resolve.
///
/// Hooks run synchronously on the caller's thread and must not block.
pub trait EvaluationHook: Send + Sync {
    /// Called when the flag resolved without error.
    fn after(&self, ctx: &HookContext, details: &EvaluationDetails<FlagValue>);

    /// Called when the caller's default was served because of `error`.
    fn error(&self, ctx: &HookContext, error: &OfrepError);
}

/// Records each evaluation as a usage event.
pub struct DataCollectorHook {
    collector: Arc<DataCollector>,
}

impl DataCollectorHook {
    /// Hook enqueueing into `collector`.
    pub fn new(collector: Arc<DataCollector>) -> Self {
        Self { collector }
    }
}

impl EvaluationHook for DataCollectorHook {
    fn after(&self, ctx: &HookContext, details: &EvaluationDetails<FlagValue>) {
        let variation = details
            .variant
            .clone()
            .unwrap_or_else(|| SDK_DEFAULT_VARIATION.to_string());

        self.collector.enqueue(FeatureEvent::new(
            ctx.flag_key.clone(),
            &ctx.context,
            details.value.to_json(),
            variation,
            false,
        ));
    }

    fn error(&self, ctx: &HookContext, _error: &OfrepError) {
        self.collector.enqueue(FeatureEvent::new(
            ctx.flag_key.clone(),
            &ctx.context,
            ctx.default_value.to_json(),
            SDK_DEFAULT_VARIATION,
            true,
        ));
    }
}
