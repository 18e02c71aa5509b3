//! REST API handlers for the dashboard client.
//!
//! The gateway owns no business logic: it parses requests, delegates to the
//! cache/history/velocity/config components, and shapes JSON responses.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use crate::adapters::{FetchContext, ServiceKind};
use crate::config::{ConfigUpdate, StorePaths};
use crate::monitor::{poll_all, record_usage};
use crate::state::SharedState;
use crate::usage::{estimate, Forecast, HistoryEntry, HistoryPeriod, UsageSnapshot};

/// Size ceiling for `POST /config` bodies.
pub const MAX_CONFIG_BYTES: usize = 64 * 1024;

/// Helper to create JSON error responses
fn json_error(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({"error": message})))
}

/// Shared application state for API handlers
pub struct ApiState {
    pub state: SharedState,
    pub ctx: FetchContext,
    pub paths: StorePaths,
}

/// Build the full route table, including the 404 fallback.
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/usage", get(get_usage_all))
        .route("/usage/{id}", get(get_usage))
        .route("/history/{id}", get(get_history))
        .route("/velocity/{id}", get(get_velocity))
        .route("/config", post(update_config))
        .route("/refresh", post(trigger_refresh))
        .fallback(not_found)
        // Transport bound; the handler enforces the exact ceiling with a JSON body
        .layer(DefaultBodyLimit::max(MAX_CONFIG_BYTES * 2))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

#[derive(Debug, Serialize)]
struct UsageListResponse {
    services: Vec<UsageSnapshot>,
}

/// Snapshot for every enabled service: cached if present, otherwise an
/// explicit "not yet polled" error snapshot.
async fn get_usage_all(State(api): State<Arc<ApiState>>) -> Json<UsageListResponse> {
    let s = api.state.read();
    let services = s
        .config
        .services
        .iter()
        .filter(|(_, cfg)| cfg.enabled)
        .map(|(id, _)| match s.cache.get(id) {
            Some(entry) => entry.data.clone(),
            None => UsageSnapshot::error(id, id, "Not yet polled"),
        })
        .collect();
    Json(UsageListResponse { services })
}

/// Fresh-or-cached snapshot for one service.
///
/// A fresh cache hit is served as-is; otherwise the adapter is invoked
/// synchronously (off the lock) and the result cached. An error snapshot is
/// still a 200; only an unknown id is a routing error.
async fn get_usage(
    State(api): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<UsageSnapshot>, (StatusCode, Json<Value>)> {
    let Some(kind) = ServiceKind::from_id(&id) else {
        return Err(json_error(
            StatusCode::NOT_FOUND,
            &format!("Unknown service: {id}"),
        ));
    };

    let cfg = {
        let s = api.state.read();
        if let Some(entry) = s.cache.get(&id) {
            if entry.is_fresh_at(Utc::now()) {
                return Ok(Json(entry.data.clone()));
            }
        }
        s.config.services.get(&id).cloned().unwrap_or_default()
    };

    let snapshot = kind.fetch(&cfg, &api.ctx).await;
    {
        api.state.write().cache.put(snapshot.clone());
    }

    if !snapshot.is_error() {
        let state = api.state.clone();
        let paths = api.paths.clone();
        let service_id = id.clone();
        let value = snapshot.percentage;
        let extra = snapshot.details.clone();
        tokio::task::spawn_blocking(move || {
            record_usage(&state, &service_id, value, extra, &paths);
        });
    }

    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    period: Option<String>,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    service_id: String,
    period: String,
    data: Vec<HistoryEntry>,
}

async fn get_history(
    State(api): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Json<HistoryResponse> {
    let period = HistoryPeriod::parse(params.period.as_deref().unwrap_or("24h"));
    let data = api.state.read().history.query(&id, period);
    Json(HistoryResponse {
        service_id: id,
        period: period.as_str().to_string(),
        data,
    })
}

#[derive(Debug, Serialize)]
struct VelocityResponse {
    service_id: String,
    #[serde(flatten)]
    forecast: Forecast,
}

async fn get_velocity(State(api): State<Arc<ApiState>>, Path(id): Path<String>) -> Json<Value> {
    let forecast = {
        let s = api.state.read();
        estimate(s.history.series(&id))
    };
    match forecast {
        Some(forecast) => {
            let response = VelocityResponse {
                service_id: id,
                forecast,
            };
            Json(json!(response))
        }
        None => Json(json!({"service_id": id, "error": "Insufficient data"})),
    }
}

/// Merge a partial config update and persist a redacted copy.
async fn update_config(
    State(api): State<Arc<ApiState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    // The transport bound rejects before the handler sees the body; keep the
    // error shape JSON either way
    let body = match body {
        Ok(body) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Err(json_error(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large"));
        }
        Err(rejection) => {
            return Err(json_error(rejection.status(), &rejection.body_text()));
        }
    };

    if body.len() > MAX_CONFIG_BYTES {
        return Err(json_error(
            StatusCode::PAYLOAD_TOO_LARGE,
            "Payload too large",
        ));
    }

    let update: ConfigUpdate = serde_json::from_slice(&body).map_err(|e| {
        json_error(StatusCode::BAD_REQUEST, &format!("Invalid JSON: {e}"))
    })?;

    let merged = {
        let mut s = api.state.write();
        s.config.merge(update);
        s.config.clone()
    };

    // Best effort: a persistence failure never fails the merge
    if let Err(e) = merged.persist(&api.paths.config_file) {
        warn!("Failed to persist config: {e}");
    }

    Ok(Json(json!({"status": "ok"})))
}

/// Kick off an out-of-band poll cycle without waiting for it.
async fn trigger_refresh(State(api): State<Arc<ApiState>>) -> Json<Value> {
    let state = api.state.clone();
    let ctx = api.ctx.clone();
    let paths = api.paths.clone();
    tokio::spawn(async move {
        poll_all(&state, &ctx, &paths).await;
    });
    Json(json!({"status": "refreshing"}))
}

async fn not_found() -> (StatusCode, Json<Value>) {
    json_error(StatusCode::NOT_FOUND, "Not found")
}
