//! HTTP API surface.

mod api;
mod server;

pub use api::{router, ApiState, MAX_CONFIG_BYTES};
pub use server::WebServer;
