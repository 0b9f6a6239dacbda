//! Configuration for plugctl
//!
//! Settings are read from `~/.plugctl/config.json` and then overridden by
//! environment variables:
//!
//! | Variable                      | Field                 | Default              |
//! |-------------------------------|-----------------------|----------------------|
//! | `PLUGCTL_PLUGIN_HOME`         | `plugin_home`         | `~/.plugctl/plugins` |
//! | `PLUGCTL_DIAL_TIMEOUT`        | `dial_timeout_secs`   | 5                    |
//! | `PLUGCTL_HTTP_RETRIES`        | `http_retries`        | 2                    |
//! | `PLUGCTL_HOOK_TIMEOUT`        | `hook_timeout_secs`   | unset (no limit)     |
//! | `PLUGCTL_SKIP_SSL_VALIDATION` | `skip_ssl_validation` | false                |
//!
//! Values that do not parse are ignored with a warning.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PlugError, Result};

// ============================================================================
// Defaults
// ============================================================================

const CONFIG_DIR_NAME: &str = ".plugctl";
const CONFIG_FILE_NAME: &str = "config.json";
const PLUGINS_DIR_NAME: &str = "plugins";

fn default_dial_timeout_secs() -> u64 {
    5
}

fn default_http_retries() -> u32 {
    2
}

// ============================================================================
// Config
// ============================================================================

/// User configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding installed plugins and the plugin registry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_home: Option<PathBuf>,

    /// Connect timeout for repository requests, in seconds.
    pub dial_timeout_secs: u64,

    /// Extra attempts for requests failing with a transient server error.
    pub http_retries: u32,

    /// Kill a plugin hook running longer than this many seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_timeout_secs: Option<u64>,

    /// Accept invalid TLS certificates from repositories.
    pub skip_ssl_validation: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plugin_home: None,
            dial_timeout_secs: default_dial_timeout_secs(),
            http_retries: default_http_retries(),
            hook_timeout_secs: None,
            skip_ssl_validation: false,
        }
    }
}

impl Config {
    /// `~/.plugctl`.
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
    }

    /// `~/.plugctl/config.json`.
    pub fn path() -> PathBuf {
        Self::dir().join(CONFIG_FILE_NAME)
    }

    /// Load the config file and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_path(&Self::path())?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load `path`, falling back to defaults when it does not exist.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            PlugError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Apply `PLUGCTL_*` variables from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(home) = get("PLUGCTL_PLUGIN_HOME").filter(|v| !v.trim().is_empty()) {
            self.plugin_home = Some(PathBuf::from(home));
        }
        if let Some(secs) = parse_env(&get, "PLUGCTL_DIAL_TIMEOUT", |v| v.parse::<u64>().ok()) {
            self.dial_timeout_secs = secs;
        }
        if let Some(retries) = parse_env(&get, "PLUGCTL_HTTP_RETRIES", |v| v.parse::<u32>().ok()) {
            self.http_retries = retries;
        }
        if let Some(secs) = parse_env(&get, "PLUGCTL_HOOK_TIMEOUT", |v| v.parse::<u64>().ok()) {
            self.hook_timeout_secs = Some(secs);
        }
        if let Some(skip) = parse_env(&get, "PLUGCTL_SKIP_SSL_VALIDATION", parse_bool) {
            self.skip_ssl_validation = skip;
        }
    }

    /// Effective plugin home.
    pub fn plugin_home(&self) -> PathBuf {
        self.plugin_home
            .clone()
            .unwrap_or_else(|| Self::dir().join(PLUGINS_DIR_NAME))
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    /// Hook timeout, `None` when unset or zero.
    pub fn hook_timeout(&self) -> Option<Duration> {
        self.hook_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

fn parse_env<T, G, P>(get: &G, key: &str, parse: P) -> Option<T>
where
    G: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    let raw = get(key)?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        warn!(key, value = %raw, "Ignoring invalid environment override");
    }
    parsed
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
