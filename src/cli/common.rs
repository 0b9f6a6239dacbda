//! Shared setup for command handlers.

use anyhow::{Context, Result};

use plugctl::commands::BuiltinCommands;
use plugctl::config::Config;
use plugctl::http::{HttpConnection, RequestLogger, RetryConnection};
use plugctl::plugins::{HttpRepositoryClient, PluginActor, PluginRegistry, RpcPluginHost};

/// Repository client used by the CLI: logging outside, retries inside.
pub(crate) type CliClient = HttpRepositoryClient<RequestLogger<RetryConnection<HttpConnection>>>;

/// Load configuration, applying a command-line `-k` on top.
pub(crate) fn load_config(skip_ssl_validation: bool) -> Result<Config> {
    let mut config = Config::load().with_context(|| "Failed to load configuration")?;
    if skip_ssl_validation {
        config.skip_ssl_validation = true;
    }
    Ok(config)
}

/// Build the plugin actor over the configured plugin home.
pub(crate) fn create_actor(config: &Config) -> Result<PluginActor<CliClient>> {
    let plugin_home = config.plugin_home();
    let registry = PluginRegistry::load(&plugin_home)
        .with_context(|| format!("Failed to load plugin registry from {}", plugin_home.display()))?;

    let base = HttpConnection::new(config.dial_timeout(), config.skip_ssl_validation)
        .with_context(|| "Failed to create HTTP client")?;
    let connection = RequestLogger::new(RetryConnection::new(base, config.http_retries));

    Ok(PluginActor::new(
        registry,
        HttpRepositoryClient::new(connection),
        Box::new(BuiltinCommands::new()),
    ))
}

pub(crate) fn create_host(config: &Config) -> RpcPluginHost {
    RpcPluginHost::new(config.hook_timeout())
}
