//! Service adapters: vendor-specific fetch logic normalized into snapshots.
//!
//! Dispatch is a closed set of variants keyed by service id. Adapters may fail
//! internally, but nothing propagates past [`ServiceKind::fetch`]: every
//! failure becomes an error snapshot with the fixed defaults.

mod claude;
mod common;
mod firecrawl;
mod serpapi;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::ServiceConfig;
use crate::credentials::CredentialStore;
use crate::usage::UsageSnapshot;

pub use common::{format_minutes, parse_reset_minutes, reset_countdown};

/// Wall-clock bound on any single upstream request.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

const USER_AGENT: &str = "QuotaDash/1.0";

/// Shared handles every adapter fetch needs.
#[derive(Clone)]
pub struct FetchContext {
    pub http: reqwest::Client,
    pub credentials: Arc<dyn CredentialStore>,
}

impl FetchContext {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, credentials })
    }
}

/// The fixed set of supported services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Firecrawl,
    SerpApi,
    ClaudeWork,
    ClaudePrivate,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 4] = [
        ServiceKind::Firecrawl,
        ServiceKind::SerpApi,
        ServiceKind::ClaudeWork,
        ServiceKind::ClaudePrivate,
    ];

    /// Adapter dispatch table. `None` is the unknown-service case, distinct
    /// from a fetch failure.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "firecrawl" => Some(Self::Firecrawl),
            "serpapi" => Some(Self::SerpApi),
            "claude_work" => Some(Self::ClaudeWork),
            "claude_private" => Some(Self::ClaudePrivate),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Firecrawl => "firecrawl",
            Self::SerpApi => "serpapi",
            Self::ClaudeWork => "claude_work",
            Self::ClaudePrivate => "claude_private",
        }
    }

    fn display_name(&self, cfg: &ServiceConfig) -> String {
        match self {
            Self::Firecrawl => "Firecrawl".to_string(),
            Self::SerpApi => "SerpAPI".to_string(),
            Self::ClaudeWork | Self::ClaudePrivate => claude::display_name(self.id(), cfg),
        }
    }

    /// Fetch one snapshot. Never fails past this boundary.
    pub async fn fetch(&self, cfg: &ServiceConfig, ctx: &FetchContext) -> UsageSnapshot {
        let result = match self {
            Self::Firecrawl => firecrawl::fetch(cfg, ctx).await,
            Self::SerpApi => serpapi::fetch(cfg, ctx).await,
            Self::ClaudeWork | Self::ClaudePrivate => claude::fetch(self.id(), cfg, ctx).await,
        };
        result.unwrap_or_else(|e| {
            UsageSnapshot::error(self.id(), &self.display_name(cfg), &e.to_string())
        })
    }
}
