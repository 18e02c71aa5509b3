use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Unified API usage dashboard daemon")]
pub struct Config {
    /// Port for the loopback HTTP API
    #[arg(short, long, default_value_t = default_port())]
    pub port: u16,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Path to config file (default: XDG config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to history file (default: XDG data dir)
    #[arg(long)]
    pub history: Option<PathBuf>,
}

impl Config {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

fn default_port() -> u16 {
    19853
}

fn default_refresh_interval() -> u64 {
    300
}

const MIN_REFRESH_INTERVAL_SECS: u64 = 1;

/// Process-wide mutable configuration: poll interval and per-service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Seconds between poll cycles, re-read each cycle
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,

    /// Per-service settings keyed by service id
    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfig>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            refresh_interval: default_refresh_interval(),
            services: BTreeMap::new(),
        }
    }
}

/// Settings for one service. Unknown adapter-specific fields are kept in
/// `extra`; credential-shaped keys among them are stripped before persisting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Display label override (used by the Claude adapters)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Day of month the quota resets (clamped to 28)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_day: Option<u32>,

    /// Browser holding the session (consumed by the credential layer)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,

    /// Browser profile path override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_path: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Partial update accepted by `POST /config`; present fields overwrite.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigUpdate {
    pub refresh_interval: Option<u64>,
    pub services: Option<BTreeMap<String, ServiceConfig>>,
}

impl RuntimeConfig {
    /// Load the persisted config, or defaults if the file is missing or
    /// unreadable. Re-asserts restrictive permissions on an existing file.
    pub fn load(path: &Path) -> Self {
        let mut config = match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<RuntimeConfig>(&text) {
                Ok(config) => {
                    restrict_permissions(path);
                    config
                }
                Err(e) => {
                    warn!("Failed to load config: {e}");
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                warn!("Failed to load config: {e}");
                Self::default()
            }
        };
        config.validate();
        config
    }

    /// Shallow merge: a field present in the update replaces the current value.
    pub fn merge(&mut self, update: ConfigUpdate) {
        if let Some(interval) = update.refresh_interval {
            self.refresh_interval = interval;
        }
        if let Some(services) = update.services {
            self.services = services;
        }
        self.validate();
    }

    /// Clamp values that would make the poller misbehave.
    pub fn validate(&mut self) {
        if self.refresh_interval < MIN_REFRESH_INTERVAL_SECS {
            self.refresh_interval = MIN_REFRESH_INTERVAL_SECS;
        }
    }

    /// Copy safe to write to disk: credential-shaped fields removed.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for service in copy.services.values_mut() {
            service.extra.retain(|key, _| !is_credential_key(key));
        }
        copy
    }

    /// Persist a redacted copy with owner-only permissions.
    pub fn persist(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.redacted())
            .context("Failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        restrict_permissions(path);
        Ok(())
    }
}

/// Whether a config key looks like it holds a secret.
pub(crate) fn is_credential_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    ["key", "token", "secret", "cookie", "password"]
        .iter()
        .any(|needle| key.contains(needle))
}

fn restrict_permissions(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
            warn!("Failed to restrict permissions on {}: {e}", path.display());
        }
    }
    #[cfg(not(unix))]
    let _ = path;
}

/// Locations of the persisted config and history files.
#[derive(Debug, Clone)]
pub struct StorePaths {
    pub config_file: PathBuf,
    pub history_file: PathBuf,
}

impl StorePaths {
    /// Resolve paths from overrides or the XDG config/data directories.
    pub fn resolve(config: Option<PathBuf>, history: Option<PathBuf>) -> Self {
        let config_file = config.unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("quotadash")
                .join("config.json")
        });
        let history_file = history.unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("quotadash")
                .join("history.json")
        });
        Self {
            config_file,
            history_file,
        }
    }
}
