//! Unified API usage dashboard daemon.
//!
//! Polls multiple metered API services (Firecrawl, SerpAPI, Claude), normalizes
//! the results into snapshots, keeps a rolling usage history, and serves all of
//! it over a small loopback HTTP API for a dashboard client.

pub mod adapters;
pub mod config;
pub mod credentials;
pub mod error;
pub mod monitor;
pub mod state;
pub mod usage;
pub mod web;
