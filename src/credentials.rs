//! Credential lookup for service adapters.
//!
//! Secrets are never stored in the runtime config. Adapters resolve them at
//! fetch time through [`CredentialStore`], and a missing credential is an
//! ordinary fetch failure, not a fault.

use std::collections::HashMap;

/// Opaque secret lookup, keyed by service id.
pub trait CredentialStore: Send + Sync {
    /// Secret for a service key, or `None` when no credential is configured.
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Reads credentials from `QUOTADASH_<KEY>` environment variables
/// (e.g. `QUOTADASH_FIRECRAWL`, `QUOTADASH_CLAUDE_WORK`).
#[derive(Debug, Default, Clone)]
pub struct EnvCredentials;

impl CredentialStore for EnvCredentials {
    fn lookup(&self, key: &str) -> Option<String> {
        let var = format!("QUOTADASH_{}", key.to_ascii_uppercase());
        std::env::var(var).ok().filter(|v| !v.is_empty())
    }
}

/// Fixed in-memory credentials, for tests and pinned deployments.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    entries: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, secret: &str) -> Self {
        self.entries.insert(key.to_string(), secret.to_string());
        self
    }
}

impl CredentialStore for StaticCredentials {
    fn lookup(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }
}
