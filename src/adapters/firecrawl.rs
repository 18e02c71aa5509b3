//! Firecrawl credit usage adapter.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::ServiceConfig;
use crate::error::AdapterError;
use crate::usage::{percent_used, Details, UsageSnapshot};

use super::common::{group_thousands, reset_countdown};
use super::FetchContext;

const USAGE_URL: &str = "https://api.firecrawl.dev/v2/team/credit-usage";
const DEFAULT_RESET_DAY: u32 = 16;

pub async fn fetch(
    cfg: &ServiceConfig,
    ctx: &FetchContext,
) -> Result<UsageSnapshot, AdapterError> {
    let api_key = ctx
        .credentials
        .lookup("firecrawl")
        .ok_or_else(|| AdapterError::CredentialMissing("No API key configured".to_string()))?;

    let resp = ctx
        .http
        .get(USAGE_URL)
        .bearer_auth(&api_key)
        .send()
        .await?;
    let status = resp.status();
    let body = resp.text().await?;

    if status == StatusCode::UNAUTHORIZED {
        return Err(AdapterError::Auth("Invalid API key".to_string()));
    }
    if status != StatusCode::OK {
        return Err(AdapterError::Http(format!("HTTP {}", status.as_u16())));
    }

    snapshot_from_body(&body, cfg.reset_day.unwrap_or(DEFAULT_RESET_DAY), Utc::now())
}

/// Map the credit-usage payload to a snapshot. The payload may or may not be
/// wrapped in a `data` envelope.
fn snapshot_from_body(
    body: &str,
    reset_day: u32,
    now: DateTime<Utc>,
) -> Result<UsageSnapshot, AdapterError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| AdapterError::Parse(e.to_string()))?;
    let inner = value.get("data").unwrap_or(&value);

    let total = inner
        .get("planCredits")
        .and_then(Value::as_f64)
        .unwrap_or(1.0);
    let remaining = inner
        .get("remainingCredits")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    let used = total - remaining;

    Ok(UsageSnapshot {
        id: "firecrawl".to_string(),
        name: "Firecrawl".to_string(),
        icon: "cloud-download".to_string(),
        percentage: percent_used(used, total),
        used,
        total,
        unit: "credits".to_string(),
        plan_name: format!("{} credits/mo", group_thousands(total)),
        reset_info: reset_countdown(reset_day, now),
        details: Details::new(),
        error: String::new(),
        last_updated: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_enveloped_payload() {
        let body = r#"{"data": {"planCredits": 20000, "remainingCredits": 15000}}"#;
        let snap = snapshot_from_body(body, 16, Utc::now()).unwrap();
        assert_eq!(snap.id, "firecrawl");
        assert_eq!(snap.used, 5000.0);
        assert_eq!(snap.total, 20000.0);
        assert_eq!(snap.percentage, 25.0);
        assert_eq!(snap.plan_name, "20,000 credits/mo");
        assert!(snap.error.is_empty());
    }

    #[test]
    fn test_bare_payload() {
        let body = r#"{"planCredits": 3000, "remainingCredits": 2000}"#;
        let snap = snapshot_from_body(body, 16, Utc::now()).unwrap();
        assert_eq!(snap.used, 1000.0);
        assert_eq!(snap.percentage, 33.3);
    }

    #[test]
    fn test_missing_fields_use_safe_defaults() {
        let snap = snapshot_from_body("{}", 16, Utc::now()).unwrap();
        assert_eq!(snap.total, 1.0);
        assert_eq!(snap.used, 1.0);
        assert_eq!(snap.percentage, 100.0);
    }

    #[test]
    fn test_overage_reads_as_full() {
        // Negative remaining credits mean the plan is overdrawn
        let body = r#"{"planCredits": 1000, "remainingCredits": -50}"#;
        let snap = snapshot_from_body(body, 16, Utc::now()).unwrap();
        assert_eq!(snap.used, 1050.0);
        assert_eq!(snap.percentage, 100.0);
    }

    #[test]
    fn test_zero_total_does_not_divide() {
        let body = r#"{"planCredits": 0, "remainingCredits": 0}"#;
        let snap = snapshot_from_body(body, 16, Utc::now()).unwrap();
        assert_eq!(snap.percentage, 0.0);
    }

    #[test]
    fn test_malformed_body_is_parse_error() {
        let err = snapshot_from_body("not json", 16, Utc::now()).unwrap_err();
        assert!(err.to_string().starts_with("Parse error:"));
    }
}
