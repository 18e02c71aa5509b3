//! Snapshot cache, usage history, and velocity estimation.

mod cache;
mod history;
mod types;
mod velocity;

pub use cache::{CachedSnapshot, UsageCache, CACHE_TTL_SECS};
pub use history::{persist_to, HistoryEntry, HistoryPeriod, HistoryStore, RETENTION_DAYS};
pub use types::{percent_used, Details, UsageSnapshot};
pub use velocity::{estimate, estimate_at, Forecast};
