//! Error types for plugctl
//!
//! This module defines the error type shared by every plugin operation.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.
//!
//! The variants mirror the failure taxonomy of the plugin lifecycle:
//! resolution, validation, installation and uninstallation. Installation
//! failures are deliberately surfaced as the raw [`std::io::Error`] inside
//! [`PlugError::Io`] so callers can match on [`std::io::ErrorKind`].

use thiserror::Error;

use crate::plugins::host::HostError;

/// The primary error type for plugctl operations.
#[derive(Error, Debug)]
pub enum PlugError {
    /// Configuration-related errors (unreadable config, bad registry file, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Standard I/O errors. Copy, permission and flush failures keep their
    /// original `ErrorKind`.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level HTTP errors (DNS, connect timeout, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A repository answered with a non-2xx status.
    #[error("HTTP status {status}: {body}")]
    RawHttpStatus { status: u16, body: String },

    /// Failures talking to a plugin subprocess.
    #[error(transparent)]
    Host(#[from] HostError),

    // ---- resolution ----
    /// The plugin is not listed by any of the searched repositories.
    #[error("Plugin {plugin_name} not found in any repository")]
    PluginNotFoundInAnyRepository { plugin_name: String },

    /// The plugin is listed, but never with a binary for this platform.
    #[error("No compatible binary found for this platform")]
    NoCompatibleBinary,

    /// Fetching a catalog failed; wraps the transport or status error.
    #[error("Could not get plugin repository '{repository_name}': {source}")]
    FetchingPluginInfoFromRepository {
        repository_name: String,
        #[source]
        source: Box<PlugError>,
    },

    // ---- validation ----
    /// Introspection failed or returned an unusable descriptor.
    #[error("File is not a valid plugin{}", .source.as_ref().map(|e| format!(": {}", e)).unwrap_or_default())]
    PluginInvalid {
        #[source]
        source: Option<Box<PlugError>>,
    },

    /// The candidate declares command names or aliases that are taken.
    #[error(
        "Plugin {plugin_name} v{plugin_version} could not be installed as it contains commands with names ({}) or aliases ({}) that are already used",
        .command_names.join(", "),
        .command_aliases.join(", ")
    )]
    PluginCommandsConflict {
        plugin_name: String,
        plugin_version: String,
        command_names: Vec<String>,
        command_aliases: Vec<String>,
    },

    /// Downloaded binary does not match the repository checksum.
    #[error("Downloaded plugin binary's checksum does not match repo metadata")]
    InvalidChecksum,

    // ---- install ----
    /// A plugin with this name is installed and the caller did not force.
    #[error("Plugin {name} {version} could not be installed. A plugin with that name is already installed. Use 'install-plugin -f' to force a reinstall.")]
    PluginAlreadyInstalled { name: String, version: String },

    /// Install argument looks like a URL with a scheme other than http(s).
    #[error("This command does not support the URL scheme in {url}")]
    UnsupportedUrlScheme { url: String },

    /// Nothing on disk and no registered repository provides the plugin.
    #[error("Plugin {plugin_name} not found on disk or in any registered repo")]
    PluginNotFoundOnDiskOrInAnyRepository { plugin_name: String },

    /// The named repository does not list the plugin.
    #[error("Plugin {plugin_name} not found in repository {repository_name}")]
    PluginNotFoundInRepository {
        plugin_name: String,
        repository_name: String,
    },

    // ---- uninstall ----
    /// No registry entry for the plugin.
    #[error("Plugin {plugin_name} does not exist")]
    PluginNotFound { plugin_name: String },

    /// The uninstall hook exited non-zero or could not be started.
    /// Reported after the plugin has been deregistered.
    #[error("The plugin's uninstall method returned an unexpected error: {source}")]
    PluginExecute {
        #[source]
        source: HostError,
    },

    /// The binary could not be deleted after every retry.
    /// Reported after the plugin has been deregistered.
    #[error("The plugin has been uninstalled but removing the binary failed: {source}")]
    PluginBinaryRemoveFailed {
        #[source]
        source: std::io::Error,
    },

    // ---- repositories ----
    /// No registered repository with this name (case-insensitive).
    #[error("Plugin repository {repository_name} not found")]
    RepositoryNotRegistered { repository_name: String },

    /// A repository with this name (case-insensitive) already exists.
    #[error("Plugin repo named '{name}' already exists, please use another name.")]
    RepositoryNameTaken { name: String },

    /// A repository with this URL already exists under another name.
    #[error("{url} ({name}) already exists.")]
    RepositoryUrlTaken { name: String, url: String },

    /// The URL did not answer like a plugin repository.
    #[error("Could not add repository '{name}' from {url}: {source}")]
    AddPluginRepository {
        name: String,
        url: String,
        #[source]
        source: Box<PlugError>,
    },
}

impl PlugError {
    /// Whether this error is a leftover-debris warning from uninstall, i.e.
    /// the plugin is deregistered but its binary may still be on disk.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            PlugError::PluginExecute { .. } | PlugError::PluginBinaryRemoveFailed { .. }
        )
    }

    /// HTTP status carried by this error, looking through fetch wrappers.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            PlugError::RawHttpStatus { status, .. } => Some(*status),
            PlugError::Http(e) => e.status().map(|s| s.as_u16()),
            PlugError::FetchingPluginInfoFromRepository { source, .. }
            | PlugError::AddPluginRepository { source, .. } => source.http_status(),
            _ => None,
        }
    }
}

/// A specialized `Result` type for plugctl operations.
pub type Result<T> = std::result::Result<T, PlugError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlugError::Config("registry file is corrupt".to_string());
        assert_eq!(err.to_string(), "Configuration error: registry file is corrupt");
    }

    #[test]
    fn test_error_from_io_keeps_kind() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: PlugError = io_err.into();
        match err {
            PlugError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::PermissionDenied),
            other => panic!("expected Io, got {:?}", other),
        }
    }

    #[test]
    fn test_plugin_invalid_display_with_and_without_cause() {
        let bare = PlugError::PluginInvalid { source: None };
        assert_eq!(bare.to_string(), "File is not a valid plugin");

        let wrapped = PlugError::PluginInvalid {
            source: Some(Box::new(PlugError::Config("no metadata".into()))),
        };
        assert!(wrapped.to_string().contains("no metadata"));
    }

    #[test]
    fn test_conflict_display_lists_names_and_aliases() {
        let err = PlugError::PluginCommandsConflict {
            plugin_name: "some-plugin".into(),
            plugin_version: "1.1.1".into(),
            command_names: vec!["p".into(), "version".into()],
            command_aliases: vec!["push".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("some-plugin v1.1.1"));
        assert!(msg.contains("(p, version)"));
        assert!(msg.contains("(push)"));
    }

    #[test]
    fn test_is_warning() {
        let remove = PlugError::PluginBinaryRemoveFailed {
            source: std::io::Error::new(std::io::ErrorKind::Other, "busy"),
        };
        assert!(remove.is_warning());
        assert!(!PlugError::NoCompatibleBinary.is_warning());
        assert!(!PlugError::PluginNotFound {
            plugin_name: "x".into()
        }
        .is_warning());
    }

    #[test]
    fn test_http_status_looks_through_wrappers() {
        let err = PlugError::FetchingPluginInfoFromRepository {
            repository_name: "repo".into(),
            source: Box::new(PlugError::RawHttpStatus {
                status: 404,
                body: "nope".into(),
            }),
        };
        assert_eq!(err.http_status(), Some(404));
        assert_eq!(PlugError::NoCompatibleBinary.http_status(), None);
    }
}
