//! Normalized usage snapshot shared by every service adapter.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Adapter-specific auxiliary fields attached to a snapshot.
pub type Details = BTreeMap<String, serde_json::Value>;

/// One service's current usage reading, normalized across vendors.
///
/// A snapshot is either fully successful (`error` is empty and all fields are
/// meaningful) or an error snapshot with fixed defaults. There are no partial
/// states.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Stable service key (e.g. "firecrawl")
    pub id: String,
    /// Display label
    pub name: String,
    /// Icon hint for the dashboard client
    pub icon: String,
    /// Used fraction of quota, 0.0-100.0
    pub percentage: f64,
    pub used: f64,
    pub total: f64,
    /// Unit of `used`/`total` ("credits", "searches", "%")
    pub unit: String,
    pub plan_name: String,
    /// Human-readable countdown to the next quota reset
    pub reset_info: String,
    #[serde(default)]
    pub details: Details,
    /// Empty on success, failure reason otherwise
    #[serde(default)]
    pub error: String,
    pub last_updated: DateTime<Utc>,
}

impl UsageSnapshot {
    /// Error snapshot with the fixed failure defaults.
    pub fn error(id: &str, name: &str, message: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            icon: String::new(),
            percentage: 0.0,
            used: 0.0,
            total: 1.0,
            unit: String::new(),
            plan_name: String::new(),
            reset_info: String::new(),
            details: Details::new(),
            error: message.to_string(),
            last_updated: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}

/// Percentage of quota used, rounded to one decimal and clamped to 0-100.
///
/// A zero or negative total yields 0 rather than a division fault; overage
/// (more used than the plan allows) reads as exactly 100.
pub fn percent_used(used: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    ((used / total * 100.0 * 10.0).round() / 10.0).clamp(0.0, 100.0)
}
