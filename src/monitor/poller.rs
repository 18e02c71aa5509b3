use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::adapters::{FetchContext, ServiceKind};
use crate::config::{ServiceConfig, StorePaths};
use crate::state::SharedState;
use crate::usage::{persist_to, Details, UsageSnapshot};

/// Recurring scheduler that refreshes every enabled service.
///
/// The refresh interval is re-read from the runtime config each cycle, so a
/// config update takes effect on the next tick without a restart.
pub struct Poller {
    state: SharedState,
    ctx: FetchContext,
    paths: StorePaths,
}

/// Handle for stopping the poller. `stop` is idempotent: it prevents any new
/// cycle from starting; an in-flight cycle may still finish.
pub struct PollerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl PollerHandle {
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Wait for the poll loop to exit (after `stop`).
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

impl Poller {
    pub fn new(state: SharedState, ctx: FetchContext, paths: StorePaths) -> Self {
        Self { state, ctx, paths }
    }

    /// Start polling in a background task
    pub fn start(self) -> PollerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            self.run(shutdown_rx).await;
        });

        PollerHandle { shutdown_tx, task }
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            poll_all(&self.state, &self.ctx, &self.paths).await;

            let interval = { self.state.read().config.refresh_interval };
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(interval)) => {}
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Poller stopped");
    }
}

/// Poll every enabled service once: update the cache unconditionally, append
/// to history only on success.
///
/// Each fetch runs in its own task so one misbehaving adapter cannot halt the
/// cycle for the others; a panic surfaces as an error snapshot.
pub async fn poll_all(state: &SharedState, ctx: &FetchContext, paths: &StorePaths) {
    let services: Vec<(String, ServiceConfig)> = {
        state
            .read()
            .config
            .services
            .iter()
            .filter(|(_, cfg)| cfg.enabled)
            .map(|(id, cfg)| (id.clone(), cfg.clone()))
            .collect()
    };

    for (service_id, cfg) in services {
        let Some(kind) = ServiceKind::from_id(&service_id) else {
            debug!("No adapter for configured service {service_id}");
            continue;
        };

        let snapshot = {
            let ctx = ctx.clone();
            let cfg = cfg.clone();
            match tokio::spawn(async move { kind.fetch(&cfg, &ctx).await }).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    error!("Error polling {service_id}: {e}");
                    UsageSnapshot::error(kind.id(), kind.id(), &e.to_string())
                }
            }
        };

        let success = !snapshot.is_error();
        let value = snapshot.percentage;
        let extra = snapshot.details.clone();

        {
            state.write().cache.put(snapshot);
        }
        if success {
            record_usage(state, &service_id, value, extra, paths);
        }
    }
}

/// Append one history point, then rewrite the history file.
///
/// Persistence is best effort: a write failure is logged and never rolls back
/// the in-memory append.
pub fn record_usage(
    state: &SharedState,
    service_id: &str,
    value: f64,
    extra: Details,
    paths: &StorePaths,
) {
    let json = {
        let mut s = state.write();
        s.history.append(service_id, value, extra);
        s.history.serialize()
    };

    match json {
        Ok(json) => {
            if let Err(e) = persist_to(&paths.history_file, &json) {
                warn!("Failed to save history: {e}");
            }
        }
        Err(e) => warn!("Failed to serialize history: {e}"),
    }
}
