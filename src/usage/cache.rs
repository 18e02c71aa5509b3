//! TTL-bounded cache of the most recent snapshot per service.
//!
//! Entries are only ever overwritten by the poller or an on-demand refresh.
//! There is no background expiry sweep: staleness is a predicate evaluated at
//! read time against the fixed TTL.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use super::types::UsageSnapshot;

/// Freshness window for cached snapshots.
pub const CACHE_TTL_SECS: i64 = 60;

/// A snapshot plus the instant it was stored.
#[derive(Debug, Clone)]
pub struct CachedSnapshot {
    pub data: UsageSnapshot,
    pub stored_at: DateTime<Utc>,
}

impl CachedSnapshot {
    /// Whether the entry is still inside the TTL as seen at `now`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.stored_at) < Duration::seconds(CACHE_TTL_SECS)
    }
}

/// Most recent snapshot per service id, last-writer-wins.
#[derive(Debug, Default)]
pub struct UsageCache {
    entries: HashMap<String, CachedSnapshot>,
}

impl UsageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditional overwrite, keyed by the snapshot's own id.
    pub fn put(&mut self, snapshot: UsageSnapshot) {
        self.put_at(snapshot, Utc::now());
    }

    pub fn put_at(&mut self, snapshot: UsageSnapshot, at: DateTime<Utc>) {
        self.entries.insert(
            snapshot.id.clone(),
            CachedSnapshot {
                data: snapshot,
                stored_at: at,
            },
        );
    }

    pub fn get(&self, service_id: &str) -> Option<&CachedSnapshot> {
        self.entries.get(service_id)
    }
}
