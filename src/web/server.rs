//! Loopback HTTP server hosting the dashboard API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::adapters::FetchContext;
use crate::config::StorePaths;
use crate::state::SharedState;

use super::api::{router, ApiState};

pub struct WebServer {
    port: u16,
    state: SharedState,
    ctx: FetchContext,
    paths: StorePaths,
}

impl WebServer {
    pub fn new(port: u16, state: SharedState, ctx: FetchContext, paths: StorePaths) -> Self {
        Self {
            port,
            state,
            ctx,
            paths,
        }
    }

    /// Serve until Ctrl-C. Binds loopback only; the API is not meant to be
    /// reachable off-host.
    pub async fn run(self) -> Result<()> {
        let app = router(Arc::new(ApiState {
            state: self.state,
            ctx: self.ctx,
            paths: self.paths,
        }))
        .layer(CorsLayer::permissive());

        let addr = SocketAddr::from(([127, 0, 0, 1], self.port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        info!("Listening on http://{addr}");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutting down");
}
