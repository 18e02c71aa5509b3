//! Claude web-session usage adapter.
//!
//! Two configured instances ("claude_work", "claude_private") share this code,
//! differing only in which session credential they resolve. The session cookie
//! itself comes from the credential layer; browser extraction is outside this
//! crate.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::ServiceConfig;
use crate::error::AdapterError;
use crate::usage::{Details, UsageSnapshot};

use super::common::{format_minutes, parse_reset_minutes, round1};
use super::FetchContext;

const ORGS_URL: &str = "https://claude.ai/api/organizations";

pub async fn fetch(
    service_id: &str,
    cfg: &ServiceConfig,
    ctx: &FetchContext,
) -> Result<UsageSnapshot, AdapterError> {
    let name = display_name(service_id, cfg);

    let session_key = ctx.credentials.lookup(service_id).ok_or_else(|| {
        AdapterError::CredentialMissing("No session cookie found".to_string())
    })?;
    let cookie = format!("sessionKey={session_key}");

    let resp = ctx
        .http
        .get(ORGS_URL)
        .header("Accept", "application/json")
        .header("Cookie", &cookie)
        .send()
        .await?;
    let status = resp.status();
    let body = resp.text().await?;

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(AdapterError::Auth("Session expired".to_string()));
    }
    if status != StatusCode::OK {
        return Err(AdapterError::Http(format!(
            "HTTP {} fetching orgs",
            status.as_u16()
        )));
    }

    let org = parse_orgs(&body)?;

    let usage_url = format!("{ORGS_URL}/{}/usage", org.id);
    let resp = ctx
        .http
        .get(&usage_url)
        .header("Accept", "application/json")
        .header("Cookie", &cookie)
        .send()
        .await?;
    let status = resp.status();
    let body = resp.text().await?;

    if status != StatusCode::OK {
        return Err(AdapterError::Http(format!(
            "HTTP {} fetching usage",
            status.as_u16()
        )));
    }

    snapshot_from_usage(service_id, &name, &org, &body, Utc::now())
}

/// Display label: config override, else the id suffix title-cased.
pub(super) fn display_name(service_id: &str, cfg: &ServiceConfig) -> String {
    let label = cfg
        .label
        .clone()
        .unwrap_or_else(|| title_case(service_id.trim_start_matches("claude_")));
    format!("Claude ({label})")
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug)]
struct OrgInfo {
    id: String,
    name: String,
    plan: String,
}

fn parse_orgs(body: &str) -> Result<OrgInfo, AdapterError> {
    let orgs: Value = serde_json::from_str(body).map_err(|e| AdapterError::Parse(e.to_string()))?;
    let org = orgs
        .as_array()
        .and_then(|list| list.first())
        .ok_or_else(|| AdapterError::Parse("No organizations found".to_string()))?;

    let caps = org
        .get("capabilities")
        .map(|c| c.to_string().to_lowercase())
        .unwrap_or_default();
    let plan = if caps.contains("max") {
        "Max"
    } else if caps.contains("pro") {
        "Pro"
    } else {
        "Free"
    };

    Ok(OrgInfo {
        id: org
            .get("uuid")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        name: org
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        plan: plan.to_string(),
    })
}

/// Utilization arrives either as a 0-1 fraction or as a percentage (>1).
fn normalize_utilization(val: f64) -> f64 {
    if val > 1.0 {
        round1(val).min(100.0)
    } else {
        round1(val * 100.0).min(100.0)
    }
}

fn snapshot_from_usage(
    service_id: &str,
    name: &str,
    org: &OrgInfo,
    body: &str,
    now: DateTime<Utc>,
) -> Result<UsageSnapshot, AdapterError> {
    let usage: Value =
        serde_json::from_str(body).map_err(|e| AdapterError::Parse(e.to_string()))?;

    let window = |key: &str| usage.get(key).cloned().unwrap_or(Value::Null);
    let utilization = |w: &Value| {
        normalize_utilization(w.get("utilization").and_then(Value::as_f64).unwrap_or(0.0))
    };
    let reset_minutes = |w: &Value| {
        parse_reset_minutes(w.get("resets_at").and_then(Value::as_str), now)
    };

    let five_hour = window("five_hour");
    let seven_day = window("seven_day");
    let sonnet = window("seven_day_sonnet");

    let fh_pct = utilization(&five_hour);
    let sd_pct = utilization(&seven_day);
    let so_pct = utilization(&sonnet);
    let fh_reset = reset_minutes(&five_hour);
    let sd_reset = reset_minutes(&seven_day);

    let primary_pct = fh_pct.max(sd_pct);

    let mut details = Details::new();
    details.insert("org_name".to_string(), Value::from(org.name.clone()));
    details.insert("five_hour_usage".to_string(), Value::from(fh_pct));
    details.insert("five_hour_reset_minutes".to_string(), Value::from(fh_reset));
    details.insert("seven_day_usage".to_string(), Value::from(sd_pct));
    details.insert("seven_day_reset_minutes".to_string(), Value::from(sd_reset));
    details.insert("sonnet_usage".to_string(), Value::from(so_pct));

    Ok(UsageSnapshot {
        id: service_id.to_string(),
        name: name.to_string(),
        icon: "dialog-messages".to_string(),
        percentage: primary_pct,
        used: primary_pct,
        total: 100.0,
        unit: "%".to_string(),
        plan_name: org.plan.clone(),
        reset_info: format_minutes(fh_reset),
        details,
        error: String::new(),
        last_updated: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn org() -> OrgInfo {
        OrgInfo {
            id: "org-1".to_string(),
            name: "Acme".to_string(),
            plan: "Max".to_string(),
        }
    }

    #[test]
    fn test_display_name() {
        let mut cfg = ServiceConfig::default();
        assert_eq!(display_name("claude_work", &cfg), "Claude (Work)");
        assert_eq!(display_name("claude_private", &cfg), "Claude (Private)");
        cfg.label = Some("Team".to_string());
        assert_eq!(display_name("claude_work", &cfg), "Claude (Team)");
    }

    #[test]
    fn test_parse_orgs_plan_detection() {
        let body = r#"[{"uuid": "org-1", "name": "Acme", "capabilities": ["claude_max", "chat"]}]"#;
        let org = parse_orgs(body).unwrap();
        assert_eq!(org.id, "org-1");
        assert_eq!(org.name, "Acme");
        assert_eq!(org.plan, "Max");

        let body = r#"[{"uuid": "org-2", "name": "Solo", "capabilities": ["claude_pro"]}]"#;
        assert_eq!(parse_orgs(body).unwrap().plan, "Pro");

        let body = r#"[{"uuid": "org-3", "name": "Solo", "capabilities": ["chat"]}]"#;
        assert_eq!(parse_orgs(body).unwrap().plan, "Free");
    }

    #[test]
    fn test_parse_orgs_empty_list() {
        let err = parse_orgs("[]").unwrap_err();
        assert_eq!(err.to_string(), "Parse error: No organizations found");
    }

    #[test]
    fn test_normalize_utilization() {
        assert_eq!(normalize_utilization(0.42), 42.0);
        assert_eq!(normalize_utilization(0.333), 33.3);
        assert_eq!(normalize_utilization(67.25), 67.3);
        assert_eq!(normalize_utilization(150.0), 100.0);
        assert_eq!(normalize_utilization(1.0), 100.0);
    }

    #[test]
    fn test_snapshot_from_usage() {
        let now = Utc::now();
        let resets = (now + Duration::minutes(90)).to_rfc3339();
        let body = format!(
            r#"{{
                "five_hour": {{"utilization": 0.72, "resets_at": "{resets}"}},
                "seven_day": {{"utilization": 0.23}},
                "seven_day_sonnet": {{"utilization": 0.05}}
            }}"#
        );

        let snap = snapshot_from_usage("claude_work", "Claude (Work)", &org(), &body, now).unwrap();
        assert_eq!(snap.percentage, 72.0);
        assert_eq!(snap.used, 72.0);
        assert_eq!(snap.total, 100.0);
        assert_eq!(snap.unit, "%");
        assert_eq!(snap.plan_name, "Max");
        assert_eq!(snap.reset_info, "1h 30m");
        assert_eq!(snap.details["org_name"], "Acme");
        assert_eq!(snap.details["seven_day_usage"], 23.0);
        assert_eq!(snap.details["sonnet_usage"], 5.0);
    }

    #[test]
    fn test_seven_day_can_be_primary() {
        let body = r#"{
            "five_hour": {"utilization": 0.10},
            "seven_day": {"utilization": 0.85}
        }"#;
        let now = Utc::now();
        let snap = snapshot_from_usage("claude_work", "Claude (Work)", &org(), body, now).unwrap();
        assert_eq!(snap.percentage, 85.0);
        // No five-hour reset time means no reset label
        assert_eq!(snap.reset_info, "");
    }

    #[test]
    fn test_null_windows_are_safe() {
        let body = r#"{"five_hour": null}"#;
        let now = Utc::now();
        let snap = snapshot_from_usage("claude_work", "Claude (Work)", &org(), body, now).unwrap();
        assert_eq!(snap.percentage, 0.0);
        assert_eq!(snap.details["five_hour_usage"], 0.0);
    }
}
