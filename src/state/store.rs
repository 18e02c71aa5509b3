use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::RuntimeConfig;
use crate::usage::{HistoryStore, UsageCache};

/// Shared state type alias
pub type SharedState = Arc<RwLock<AppState>>;

/// All mutable shared state behind one coarse lock: the runtime config, the
/// snapshot cache, and the usage history.
///
/// The lock is only ever held to read config in or write results out, never
/// across an adapter's network call.
#[derive(Debug)]
pub struct AppState {
    pub config: RuntimeConfig,
    pub cache: UsageCache,
    pub history: HistoryStore,
}

impl AppState {
    pub fn new(config: RuntimeConfig, history: HistoryStore) -> Self {
        Self {
            config,
            cache: UsageCache::new(),
            history,
        }
    }

    /// Create shared state wrapped for concurrent access
    pub fn shared(config: RuntimeConfig, history: HistoryStore) -> SharedState {
        Arc::new(RwLock::new(Self::new(config, history)))
    }
}
