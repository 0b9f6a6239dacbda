//! Persisted plugin registry for plugctl
//!
//! This module provides the `PluginRegistry` struct that records installed
//! plugins and registered plugin repositories. The registry lives in
//! `<plugin_home>/config.json` and is the only long-lived mutable state of
//! the plugin system.
//!
//! Mutations only touch memory. Callers must follow every mutation with
//! [`PluginRegistry::write_plugin_config`]; a failed write leaves the
//! in-memory change in place and the caller can simply retry the command.
//! There is no file locking: one writer per CLI invocation is assumed.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{PlugError, Result};

use super::types::{Plugin, PluginRepository};

/// Name of the repository registered in a fresh registry.
pub const DEFAULT_REPOSITORY_NAME: &str = "CF-Community";

/// URL of the repository registered in a fresh registry.
pub const DEFAULT_REPOSITORY_URL: &str = "https://plugins.cloudfoundry.org";

/// File name of the registry inside the plugin home.
pub const REGISTRY_FILE_NAME: &str = "config.json";

/// On-disk shape of the registry.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    plugins: HashMap<String, Plugin>,

    #[serde(default)]
    repositories: Vec<PluginRepository>,
}

/// Installed plugins and registered repositories.
///
/// # Example
///
/// ```rust,no_run
/// use plugctl::plugins::PluginRegistry;
///
/// let mut registry = PluginRegistry::load("/home/user/.plugctl/plugins").unwrap();
/// registry.remove_plugin("stale-plugin");
/// registry.write_plugin_config().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct PluginRegistry {
    /// Directory holding installed binaries and the registry file.
    plugin_home: PathBuf,

    /// Map from plugin name to plugin record.
    plugins: HashMap<String, Plugin>,

    /// Registered repositories in registration order.
    repositories: Vec<PluginRepository>,
}

impl PluginRegistry {
    /// Create an empty registry rooted at `plugin_home`, seeded with the
    /// default repository. Nothing is read or written.
    pub fn new(plugin_home: impl Into<PathBuf>) -> Self {
        Self {
            plugin_home: plugin_home.into(),
            plugins: HashMap::new(),
            repositories: vec![PluginRepository::new(
                DEFAULT_REPOSITORY_NAME,
                DEFAULT_REPOSITORY_URL,
            )],
        }
    }

    /// Load the registry from `<plugin_home>/config.json`.
    ///
    /// A missing file yields [`PluginRegistry::new`]. A present but
    /// malformed file is an error rather than silently starting over.
    pub fn load(plugin_home: impl Into<PathBuf>) -> Result<Self> {
        let plugin_home = plugin_home.into();
        let path = plugin_home.join(REGISTRY_FILE_NAME);

        if !path.exists() {
            debug!(path = %path.display(), "No plugin registry yet, starting empty");
            return Ok(Self::new(plugin_home));
        }

        let content = fs::read_to_string(&path)?;
        let file: RegistryFile = serde_json::from_str(&content).map_err(|e| {
            PlugError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        let plugins = file
            .plugins
            .into_iter()
            .map(|(name, mut plugin)| {
                plugin.name = name.clone();
                (name, plugin)
            })
            .collect();

        Ok(Self {
            plugin_home,
            plugins,
            repositories: file.repositories,
        })
    }

    /// Directory where plugin binaries are installed.
    pub fn plugin_home(&self) -> &Path {
        &self.plugin_home
    }

    /// Path of the registry file.
    pub fn config_path(&self) -> PathBuf {
        self.plugin_home.join(REGISTRY_FILE_NAME)
    }

    /// Installed plugins sorted case-insensitively by name.
    pub fn plugins(&self) -> Vec<Plugin> {
        let mut plugins: Vec<Plugin> = self.plugins.values().cloned().collect();
        plugins.sort_by_key(|p| p.name.to_lowercase());
        plugins
    }

    /// Look up an installed plugin by exact name.
    pub fn get_plugin(&self, name: &str) -> Option<&Plugin> {
        self.plugins.get(name)
    }

    /// Look up an installed plugin ignoring case.
    pub fn get_plugin_case_insensitive(&self, name: &str) -> Option<&Plugin> {
        self.plugins
            .values()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Insert or replace a plugin record by name.
    pub fn add_plugin(&mut self, plugin: Plugin) {
        info!(
            plugin = %plugin.name,
            version = %plugin.version,
            commands = plugin.command_count(),
            "Registered plugin"
        );
        self.plugins.insert(plugin.name.clone(), plugin);
    }

    /// Remove a plugin record. Returns whether it was present.
    pub fn remove_plugin(&mut self, name: &str) -> bool {
        let removed = self.plugins.remove(name).is_some();
        if removed {
            info!(plugin = %name, "Deregistered plugin");
        }
        removed
    }

    /// Number of installed plugins.
    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    /// Registered repositories in registration order.
    pub fn plugin_repositories(&self) -> &[PluginRepository] {
        &self.repositories
    }

    /// Append a repository. Uniqueness is the caller's concern.
    pub fn add_plugin_repository(&mut self, name: &str, url: &str) {
        self.repositories.push(PluginRepository::new(name, url));
    }

    /// Remove every repository whose name matches ignoring case.
    pub fn remove_plugin_repository(&mut self, name: &str) -> bool {
        let before = self.repositories.len();
        self.repositories
            .retain(|r| !r.name.eq_ignore_ascii_case(name));
        before != self.repositories.len()
    }

    /// Durably rewrite the whole registry file.
    ///
    /// The new content is written to a temp file in the plugin home, synced,
    /// and renamed over the old file, so readers never observe a partial
    /// registry.
    pub fn write_plugin_config(&self) -> Result<()> {
        fs::create_dir_all(&self.plugin_home)?;

        let file = RegistryFile {
            plugins: self.plugins.clone(),
            repositories: self.repositories.clone(),
        };
        let content = serde_json::to_vec_pretty(&file)?;

        let mut tmp = NamedTempFile::new_in(&self.plugin_home)?;
        tmp.write_all(&content)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.config_path()).map_err(|e| e.error)?;

        debug!(
            path = %self.config_path().display(),
            plugins = self.plugins.len(),
            repositories = self.repositories.len(),
            "Wrote plugin registry"
        );
        Ok(())
    }
}
