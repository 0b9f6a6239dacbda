//! plugctl - plugin manager for command-line clients
//!
//! Discovers plugins in remote repositories, installs them after checking
//! their commands for conflicts, and uninstalls them through their own
//! uninstall hook.

pub mod commands;
pub mod config;
pub mod error;
pub mod http;
pub mod plugins;
pub mod utils;

pub use config::Config;
pub use error::{PlugError, Result};
