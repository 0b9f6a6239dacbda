//! Plugin validation and command conflict detection
//!
//! A candidate binary is asked for its metadata and then checked against
//! the built-in commands and the commands of every other installed plugin.
//! Both the name and the alias of each declared command are compared with
//! both the names and the aliases already taken. Reinstalling a plugin under
//! its own name never conflicts with itself.

use std::path::Path;

use tracing::{debug, warn};

use crate::commands::CommandList;
use crate::error::{PlugError, Result};

use super::host::PluginHost;
use super::types::Plugin;

/// Whether `value` is taken by `plugin`'s commands. Empty strings never are.
fn taken_by_plugin(value: &str, plugin: &Plugin) -> bool {
    !value.is_empty()
        && plugin
            .commands
            .iter()
            .any(|c| c.name == value || (!c.alias.is_empty() && c.alias == value))
}

fn taken_by_builtin<L: CommandList + ?Sized>(value: &str, commands: &L) -> bool {
    !value.is_empty() && (commands.has_command(value) || commands.has_alias(value))
}

/// Introspect the binary at `candidate_path` and check it can be installed
/// next to `installed`.
///
/// Returns the declared plugin (without a location) on success.
pub fn validate<H, L>(
    host: &H,
    commands: &L,
    installed: &[Plugin],
    candidate_path: &Path,
) -> Result<Plugin>
where
    H: PluginHost + ?Sized,
    L: CommandList + ?Sized,
{
    let plugin = host.describe(candidate_path).map_err(|e| {
        debug!(path = %candidate_path.display(), error = %e, "Plugin introspection failed");
        PlugError::PluginInvalid {
            source: Some(Box::new(PlugError::Host(e))),
        }
    })?;

    if plugin.name.is_empty() || plugin.commands.is_empty() {
        return Err(PlugError::PluginInvalid { source: None });
    }

    let others: Vec<&Plugin> = installed.iter().filter(|p| p.name != plugin.name).collect();
    let taken = |value: &str| {
        taken_by_builtin(value, commands) || others.iter().any(|p| taken_by_plugin(value, p))
    };

    let mut command_names = Vec::new();
    let mut command_aliases = Vec::new();
    for command in &plugin.commands {
        if taken(command.name.as_str()) {
            command_names.push(command.name.clone());
        }
        if taken(command.alias.as_str()) {
            command_aliases.push(command.alias.clone());
        }
    }

    if !command_names.is_empty() || !command_aliases.is_empty() {
        command_names.sort_by_key(|n| n.to_lowercase());
        command_aliases.sort_by_key(|a| a.to_lowercase());
        warn!(
            plugin = %plugin.name,
            names = ?command_names,
            aliases = ?command_aliases,
            "Plugin commands conflict with existing commands"
        );
        return Err(PlugError::PluginCommandsConflict {
            plugin_name: plugin.name,
            plugin_version: plugin.version.to_string(),
            command_names,
            command_aliases,
        });
    }

    Ok(plugin)
}
