//! Plugin types for plugctl
//!
//! This module defines the records kept in the plugin registry
//! (`Plugin`, `PluginRepository`), the transient resolution results
//! (`PluginInfo`, `OutdatedPlugin`) and the repository catalog document
//! served at `<repository>/list`.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha1::{Digest, Sha1};

/// Three-part plugin version as declared by the plugin binary itself.
///
/// Ordering is lexicographic over `(major, minor, build)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PluginVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
}

impl PluginVersion {
    pub fn new(major: u32, minor: u32, build: u32) -> Self {
        Self {
            major,
            minor,
            build,
        }
    }
}

impl fmt::Display for PluginVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

/// Usage text shown by `help` for a plugin command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginUsageDetails {
    #[serde(default)]
    pub usage: String,

    /// Flag name to flag description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<HashMap<String, String>>,
}

/// A command contributed by a plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginCommand {
    pub name: String,

    /// Optional short alias. Empty when the command has none.
    #[serde(default)]
    pub alias: String,

    #[serde(default)]
    pub help_text: String,

    #[serde(default)]
    pub usage_details: PluginUsageDetails,
}

impl PluginCommand {
    /// Convenience constructor used by tests and the built-in table.
    pub fn new(name: &str, alias: &str) -> Self {
        Self {
            name: name.to_string(),
            alias: alias.to_string(),
            ..Default::default()
        }
    }
}

/// An installed (or about to be installed) plugin.
///
/// The name is the registry key; it is serialized as the map key of the
/// registry file rather than inside the record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plugin {
    #[serde(skip)]
    pub name: String,

    pub version: PluginVersion,

    /// Absolute path of the installed binary. Empty until installed.
    #[serde(default)]
    pub location: PathBuf,

    #[serde(default)]
    pub commands: Vec<PluginCommand>,
}

impl Plugin {
    /// SHA-1 of the installed binary as lowercase hex, or `"N/A"` when the
    /// binary cannot be read.
    pub fn calculate_sha1(&self) -> String {
        match sha1_of_file(&self.location) {
            Ok(digest) => digest,
            Err(_) => "N/A".to_string(),
        }
    }

    /// Number of commands contributed by this plugin.
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }
}

pub(crate) fn sha1_of_file(path: &std::path::Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha1::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// A user-registered plugin repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRepository {
    pub name: String,
    pub url: String,
}

impl PluginRepository {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

/// The download candidate chosen by a resolution call. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub url: String,
    pub checksum: String,
}

/// An installed plugin for which a registered repository offers a newer
/// version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutdatedPlugin {
    pub name: String,
    pub current_version: String,
    pub latest_version: String,
}

// ---------------------------------------------------------------------------
// Repository catalog
// ---------------------------------------------------------------------------

/// The document served by a plugin repository at `<url>/list`.
///
/// # Example
///
/// ```json
/// {
///   "plugins": [
///     {
///       "name": "echo",
///       "description": "echoes things",
///       "version": "1.2.3",
///       "binaries": [
///         { "platform": "linux64", "url": "https://example.com/echo", "checksum": "0beec7b5..." }
///       ]
///     }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryCatalog {
    #[serde(default)]
    pub plugins: Vec<CatalogPlugin>,
}

/// One plugin entry of a repository catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogPlugin {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub binaries: Vec<CatalogBinary>,

    /// Fields this crate does not interpret (authors, dates, download
    /// counts...). Integers are kept exactly as served.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl CatalogPlugin {
    /// The binary published for `platform`, if any.
    pub fn binary_for(&self, platform: &str) -> Option<&CatalogBinary> {
        self.binaries.iter().find(|b| b.platform == platform)
    }
}

/// A platform-specific download of a catalog plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogBinary {
    pub platform: String,
    pub url: String,

    #[serde(default)]
    pub checksum: String,
}
