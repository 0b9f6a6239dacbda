//! Plugin system for plugctl
//!
//! Plugins are standalone executables that add commands to the client. They
//! are published by plugin repositories, installed into the plugin home and
//! recorded in a registry file next to them.
//!
//! # Architecture
//!
//! - **types**: Registry records and the repository catalog format
//! - **registry**: The persisted set of installed plugins and repositories
//! - **repository**: Fetching catalogs and binaries from repositories
//! - **resolver**: Picking the newest compatible release across repositories
//! - **checksum**: Digest check for downloaded binaries
//! - **host**: Running plugin binaries over JSON-RPC
//! - **validator**: Metadata sanity and command conflict checks
//! - **installer** / **uninstaller**: Moving binaries in and out of the plugin home
//! - **actor**: The operations behind the plugin CLI commands
//!
//! # Plugin Home Layout
//!
//! ```text
//! ~/.plugctl/plugins/
//! ├── config.json          registry: installed plugins + repositories
//! ├── echo-plugin          installed binaries, mode 0700
//! └── staging…/            transient, one per install
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use plugctl::commands::BuiltinCommands;
//! use plugctl::http::{HttpConnection, RetryConnection};
//! use plugctl::plugins::{HttpRepositoryClient, InstallOptions, PluginActor, PluginRegistry, RpcPluginHost};
//!
//! let registry = PluginRegistry::load("/home/user/.plugctl/plugins").unwrap();
//! let connection = RetryConnection::new(HttpConnection::new(Duration::from_secs(5), false).unwrap(), 2);
//! let mut actor = PluginActor::new(
//!     registry,
//!     HttpRepositoryClient::new(connection),
//!     Box::new(BuiltinCommands::new()),
//! );
//!
//! let host = RpcPluginHost::default();
//! let plugin = actor
//!     .install_from_any_repository(&host, "echo", InstallOptions::default())
//!     .unwrap();
//! println!("Installed {} {}", plugin.name, plugin.version);
//! ```

pub mod actor;
pub mod checksum;
pub mod host;
pub mod installer;
pub mod registry;
pub mod repository;
pub mod resolver;
pub mod types;
pub mod uninstaller;
pub mod validator;

pub use actor::{InstallOptions, InstallSource, InstalledPlugin, PluginActor};
pub use host::{HostError, PluginHost, RpcPluginHost};
pub use registry::PluginRegistry;
pub use repository::{HttpRepositoryClient, RepositoryClient};
pub use types::{OutdatedPlugin, Plugin, PluginCommand, PluginInfo, PluginRepository, PluginVersion};
pub use uninstaller::Uninstaller;
