use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use quotadash::adapters::FetchContext;
use quotadash::config::{Config, RuntimeConfig, StorePaths};
use quotadash::credentials::EnvCredentials;
use quotadash::monitor::Poller;
use quotadash::state::AppState;
use quotadash::usage::HistoryStore;
use quotadash::web::WebServer;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Config::parse_args();

    // Setup logging
    setup_logging(cli.debug);

    // Load persisted state
    let paths = StorePaths::resolve(cli.config, cli.history);
    let config = RuntimeConfig::load(&paths.config_file);
    let history = HistoryStore::load(&paths.history_file);
    let state = AppState::shared(config, history);

    let ctx = FetchContext::new(Arc::new(EnvCredentials))?;

    // Background poll loop
    let poller = Poller::new(state.clone(), ctx.clone(), paths.clone()).start();

    // Serve the API until shutdown
    let server = WebServer::new(cli.port, state, ctx, paths);
    let result = server.run().await;

    poller.stop();
    poller.join().await;
    result
}

fn setup_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("quotadash=debug")
    } else {
        EnvFilter::new("quotadash=info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
