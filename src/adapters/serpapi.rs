//! SerpAPI monthly search quota adapter.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::ServiceConfig;
use crate::error::AdapterError;
use crate::usage::{percent_used, Details, UsageSnapshot};

use super::common::reset_countdown;
use super::FetchContext;

const ACCOUNT_URL: &str = "https://serpapi.com/account.json";
const DEFAULT_RESET_DAY: u32 = 19;

pub async fn fetch(
    cfg: &ServiceConfig,
    ctx: &FetchContext,
) -> Result<UsageSnapshot, AdapterError> {
    let api_key = ctx
        .credentials
        .lookup("serpapi")
        .ok_or_else(|| AdapterError::CredentialMissing("No API key configured".to_string()))?;

    let resp = ctx
        .http
        .get(ACCOUNT_URL)
        .query(&[("api_key", api_key.as_str())])
        .send()
        .await?;
    let status = resp.status();
    let body = resp.text().await?;

    if status != StatusCode::OK {
        return Err(AdapterError::Http(format!("HTTP {}", status.as_u16())));
    }

    snapshot_from_body(&body, cfg.reset_day.unwrap_or(DEFAULT_RESET_DAY), Utc::now())
}

fn snapshot_from_body(
    body: &str,
    reset_day: u32,
    now: DateTime<Utc>,
) -> Result<UsageSnapshot, AdapterError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| AdapterError::Parse(e.to_string()))?;

    // The account endpoint reports auth failures in-band
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        if !error.is_empty() {
            return Err(AdapterError::Auth(error.to_string()));
        }
    }

    let total = value
        .get("searches_per_month")
        .and_then(Value::as_f64)
        .unwrap_or(1.0);
    let remaining = value
        .get("total_searches_left")
        .and_then(Value::as_f64)
        .or_else(|| value.get("plan_searches_left").and_then(Value::as_f64))
        .unwrap_or(0.0);
    let used = total - remaining;

    let mut details = Details::new();
    details.insert(
        "hourly".to_string(),
        value.get("last_hour_searches").cloned().unwrap_or(Value::from(0)),
    );

    Ok(UsageSnapshot {
        id: "serpapi".to_string(),
        name: "SerpAPI".to_string(),
        icon: "search".to_string(),
        percentage: percent_used(used, total),
        used,
        total,
        unit: "searches".to_string(),
        plan_name: value
            .get("plan_name")
            .and_then(Value::as_str)
            .unwrap_or("Plan")
            .to_string(),
        reset_info: reset_countdown(reset_day, now),
        details,
        error: String::new(),
        last_updated: now,
    })
}
