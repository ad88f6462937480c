//! Holds the evaluation context that refresh cycles are computed for.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::types::EvaluationContext;

/// The most recently set evaluation context.
///
/// Polls always refresh for whatever context is current when they fire, so
/// a context change between two ticks is picked up by the next one.
///
/// # Example
///
/// ```rust
/// use ofrep_provider::core::ContextManager;
/// use ofrep_provider::types::EvaluationContext;
///
/// let manager = ContextManager::new();
/// manager.set(EvaluationContext::with_targeting_key("user-123"));
///
/// assert_eq!(
///     manager.get().targeting_key.as_deref(),
///     Some("user-123")
/// );
/// ```
#[derive(Clone, Default)]
pub struct ContextManager {
    context: Arc<RwLock<Option<EvaluationContext>>>,
}

impl ContextManager {
    /// Creates a manager with no context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current context.
    pub fn set(&self, context: EvaluationContext) {
        *self.context.write() = Some(context);
    }

    /// Current context, or an empty one if none was set yet.
    pub fn get(&self) -> EvaluationContext {
        self.context.read().clone().unwrap_or_default()
    }

    /// Whether a context was set.
    pub fn has_context(&self) -> bool {
        self.context.read().is_some()
    }

    /// Forgets the current context.
    pub fn clear(&self) {
        *self.context.write() = None;
    }
}
