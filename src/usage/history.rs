//! Append-only per-service usage history with a rolling retention window.
//!
//! The whole store is rewritten to disk after each append; persistence is best
//! effort and never rolls back the in-memory state.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::types::Details;

/// Maximum age of a history entry before pruning.
pub const RETENTION_DAYS: i64 = 28;

/// One time-series point for a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    /// Usage percentage, rounded to one decimal on append
    pub value: f64,
    /// Adapter-specific counters merged into the entry
    #[serde(flatten, default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: Details,
}

/// Query window for [`HistoryStore::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryPeriod {
    Day,
    Week,
    Month,
}

impl HistoryPeriod {
    /// Parse a period string; unknown values fall back to the 24-hour window.
    pub fn parse(s: &str) -> Self {
        match s {
            "7d" => Self::Week,
            "28d" => Self::Month,
            _ => Self::Day,
        }
    }

    pub fn hours(&self) -> i64 {
        match self {
            Self::Day => 24,
            Self::Week => 168,
            Self::Month => 672,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "24h",
            Self::Week => "7d",
            Self::Month => "28d",
        }
    }
}

/// In-memory `service_id -> [HistoryEntry]` time series.
///
/// Entries are appended in fetch-completion order and never reordered; pruning
/// drops old entries but never mutates survivors.
#[derive(Debug, Default)]
pub struct HistoryStore {
    series: BTreeMap<String, Vec<HistoryEntry>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the persisted store, or start empty if the file is missing or
    /// unreadable.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(series) => Self { series },
                Err(e) => {
                    warn!("Failed to load history: {e}");
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                warn!("Failed to load history: {e}");
                Self::default()
            }
        }
    }

    /// Append one point and prune the service's series to the retention window.
    pub fn append(&mut self, service_id: &str, value: f64, extra: Details) {
        self.append_at(service_id, value, extra, Utc::now());
    }

    pub fn append_at(&mut self, service_id: &str, value: f64, extra: Details, at: DateTime<Utc>) {
        let entries = self.series.entry(service_id.to_string()).or_default();
        entries.push(HistoryEntry {
            timestamp: at,
            value: (value * 10.0).round() / 10.0,
            extra,
        });

        let cutoff = at - Duration::days(RETENTION_DAYS);
        entries.retain(|e| e.timestamp > cutoff);
    }

    /// Entries newer than `now - period`, in original append order.
    pub fn query(&self, service_id: &str, period: HistoryPeriod) -> Vec<HistoryEntry> {
        self.query_at(service_id, period, Utc::now())
    }

    pub fn query_at(
        &self,
        service_id: &str,
        period: HistoryPeriod,
        now: DateTime<Utc>,
    ) -> Vec<HistoryEntry> {
        let cutoff = now - Duration::hours(period.hours());
        self.series
            .get(service_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.timestamp > cutoff)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Full series for a service, oldest first.
    pub fn series(&self, service_id: &str) -> &[HistoryEntry] {
        self.series.get(service_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Serialize the whole store for persistence.
    pub fn serialize(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.series)
    }
}

/// Rewrite the history file wholesale. Callers treat failure as non-fatal.
pub fn persist_to(path: &Path, json: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_append_then_query_returns_entry() {
        let mut store = HistoryStore::new();
        let now = Utc::now();
        store.append_at("serpapi", 42.35, Details::new(), now);

        let entries = store.query_at("serpapi", HistoryPeriod::Day, now);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, 42.4);
        assert_eq!(entries[0].timestamp, now);
    }

    #[test]
    fn test_prune_drops_entries_past_retention() {
        let mut store = HistoryStore::new();
        let now = Utc::now();
        store.append_at("serpapi", 10.0, Details::new(), now - Duration::days(30));
        store.append_at("serpapi", 20.0, Details::new(), now - Duration::days(10));
        store.append_at("serpapi", 30.0, Details::new(), now);

        let entries = store.query_at("serpapi", HistoryPeriod::Month, now);
        assert_eq!(entries.len(), 2);
        assert!(entries
            .iter()
            .all(|e| e.timestamp > now - Duration::days(RETENTION_DAYS)));
        // Survivors keep their append order
        assert_eq!(entries[0].value, 20.0);
        assert_eq!(entries[1].value, 30.0);
    }

    #[test]
    fn test_query_windows() {
        let mut store = HistoryStore::new();
        let now = Utc::now();
        store.append_at("firecrawl", 5.0, Details::new(), now - Duration::days(20));
        store.append_at("firecrawl", 6.0, Details::new(), now - Duration::days(3));
        store.append_at("firecrawl", 7.0, Details::new(), now - Duration::hours(2));

        assert_eq!(store.query_at("firecrawl", HistoryPeriod::Day, now).len(), 1);
        assert_eq!(store.query_at("firecrawl", HistoryPeriod::Week, now).len(), 2);
        assert_eq!(store.query_at("firecrawl", HistoryPeriod::Month, now).len(), 3);
    }

    #[test]
    fn test_query_unknown_service_is_empty() {
        let store = HistoryStore::new();
        assert!(store.query("nope", HistoryPeriod::Day).is_empty());
    }

    #[test]
    fn test_period_parse_fallback() {
        assert_eq!(HistoryPeriod::parse("24h"), HistoryPeriod::Day);
        assert_eq!(HistoryPeriod::parse("7d"), HistoryPeriod::Week);
        assert_eq!(HistoryPeriod::parse("28d"), HistoryPeriod::Month);
        assert_eq!(HistoryPeriod::parse("1y"), HistoryPeriod::Day);
        assert_eq!(HistoryPeriod::parse(""), HistoryPeriod::Day);
    }

    #[test]
    fn test_extra_fields_flatten_into_entry() {
        let mut store = HistoryStore::new();
        let now = Utc::now();
        let mut extra = Details::new();
        extra.insert("hourly".to_string(), serde_json::json!(12));
        store.append_at("serpapi", 50.0, extra, now);

        let json = store.serialize().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["serpapi"][0]["hourly"], 12);
        assert_eq!(value["serpapi"][0]["value"], 50.0);
    }

    #[test]
    fn test_persist_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.json");

        let mut store = HistoryStore::new();
        let now = Utc::now();
        store.append_at("claude_work", 61.2, Details::new(), now);
        persist_to(&path, &store.serialize().unwrap()).unwrap();

        let loaded = HistoryStore::load(&path);
        assert_eq!(loaded.series("claude_work").len(), 1);
        assert_eq!(loaded.series("claude_work")[0].value, 61.2);
    }

    #[test]
    fn test_load_missing_or_corrupt_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(HistoryStore::load(&missing).series("x").is_empty());

        let corrupt = dir.path().join("corrupt.json");
        std::fs::write(&corrupt, "{not json").unwrap();
        assert!(HistoryStore::load(&corrupt).series("x").is_empty());
    }
}
