use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::types::CachedFlag;

pub type FlagSnapshot = HashMap<String, CachedFlag>;

/// Snapshot cache of flag evaluations.
///
/// Holds exactly one refresh's worth of flags. `replace` swaps the whole
/// map behind an `Arc`, so a reader either sees the old snapshot or the new
/// one, never a mix.
#[derive(Clone, Default)]
pub struct FlagCache {
    snapshot: Arc<RwLock<Arc<FlagSnapshot>>>,
}

impl FlagCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached evaluation for `key`.
    pub fn lookup(&self, key: &str) -> Option<CachedFlag> {
        self.snapshot.read().get(key).cloned()
    }

    /// Installs a new snapshot; previous entries are discarded, not merged.
    pub fn replace(&self, flags: FlagSnapshot) {
        let next = Arc::new(flags);
        *self.snapshot.write() = next;
    }

    /// Current snapshot. Later replaces do not affect the returned map.
    pub fn snapshot(&self) -> Arc<FlagSnapshot> {
        let guard = self.snapshot.read();
        Arc::clone(&*guard)
    }

    /// Whether `key` is in the current snapshot.
    pub fn has(&self, key: &str) -> bool {
        self.snapshot.read().contains_key(key)
    }

    /// Number of flags in the current snapshot.
    pub fn len(&self) -> usize {
        self.snapshot.read().len()
    }

    /// Whether the current snapshot has no flags.
    pub fn is_empty(&self) -> bool {
        self.snapshot.read().is_empty()
    }

    /// Flag keys in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.snapshot.read().keys().cloned().collect()
    }
}
