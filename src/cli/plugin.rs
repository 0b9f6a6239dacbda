//! Plugin and plugin repository command handlers.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

use plugctl::plugins::{InstallOptions, InstallSource};
use plugctl::PlugError;

use super::common::{create_actor, create_host, load_config};

const UNTRUSTED_WARNING: &str = "Attention: Plugins are binaries written by potentially untrusted authors.\nInstall and use plugins at your own risk.";

/// Read a yes/no answer from `input`. Anything but `y`/`yes` is a no.
fn confirm(input: &mut impl BufRead, question: &str) -> Result<bool> {
    print!("{} [yN]: ", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .with_context(|| "Failed to read from stdin")?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

/// Install a plugin from a path, URL or repository.
pub(crate) fn cmd_install_plugin(
    target: String,
    repository: Option<String>,
    force: bool,
    skip_ssl_validation: bool,
) -> Result<()> {
    let config = load_config(skip_ssl_validation)?;
    let mut actor = create_actor(&config)?;
    let host = create_host(&config);

    let source = actor.detect_source(&target, repository.as_deref())?;
    match &source {
        InstallSource::Path(path) => println!("Installing plugin {}...", path.display()),
        InstallSource::Url(url) => println!("Downloading plugin from {}...", url),
        InstallSource::Repository {
            plugin_name,
            repository_name,
        } => println!(
            "Searching {} for plugin {}...",
            repository_name, plugin_name
        ),
        InstallSource::AnyRepository(name) => {
            println!("Searching registered repositories for plugin {}...", name)
        }
    }

    println!("{}", UNTRUSTED_WARNING);
    let question = format!("Do you want to install the plugin {}?", target);
    if !force && !confirm(&mut io::stdin().lock(), &question)? {
        println!("Plugin installation cancelled.");
        return Ok(());
    }

    let plugin = actor
        .install(&host, &source, InstallOptions { force })
        .with_context(|| format!("Failed to install plugin {}", target))?;

    println!(
        "Plugin {} {} successfully installed.",
        plugin.name, plugin.version
    );
    Ok(())
}

/// Uninstall a plugin. Leftover-binary problems are reported but do not fail.
pub(crate) fn cmd_uninstall_plugin(name: String) -> Result<()> {
    let config = load_config(false)?;
    let mut actor = create_actor(&config)?;
    let host = create_host(&config);

    println!("Uninstalling plugin {}...", name);
    match actor.uninstall_plugin(&host, &name) {
        Ok(()) => {}
        Err(e) if e.is_warning() => eprintln!("Warning: {}", e),
        Err(e) => return Err(e).with_context(|| format!("Failed to uninstall plugin {}", name)),
    }

    println!("Plugin {} successfully uninstalled.", name);
    Ok(())
}

/// List installed plugins.
pub(crate) fn cmd_plugins(checksum: bool, outdated: bool) -> Result<()> {
    let config = load_config(false)?;
    let actor = create_actor(&config)?;

    if outdated {
        let report = actor
            .outdated_plugins()
            .with_context(|| "Failed to check plugin repositories")?;
        if report.is_empty() {
            println!("No plugins have updates available.");
            return Ok(());
        }
        println!("{:<30} {:<15} {:<15}", "plugin", "version", "latest version");
        for entry in report {
            println!(
                "{:<30} {:<15} {:<15}",
                entry.name, entry.current_version, entry.latest_version
            );
        }
        return Ok(());
    }

    let plugins = actor.plugins(checksum);
    if plugins.is_empty() {
        println!("No plugins installed.");
        return Ok(());
    }

    if checksum {
        println!("{:<30} {:<10} {}", "plugin", "version", "sha1");
        for entry in &plugins {
            println!(
                "{:<30} {:<10} {}",
                entry.plugin.name,
                entry.plugin.version,
                entry.sha1.as_deref().unwrap_or("N/A")
            );
        }
        return Ok(());
    }

    println!("{:<30} {:<10} {:<25} {}", "plugin", "version", "command name", "command help");
    for entry in &plugins {
        for command in &entry.plugin.commands {
            let name = if command.alias.is_empty() {
                command.name.clone()
            } else {
                format!("{}, {}", command.name, command.alias)
            };
            println!(
                "{:<30} {:<10} {:<25} {}",
                entry.plugin.name, entry.plugin.version, name, command.help_text
            );
        }
    }
    Ok(())
}

/// Register a plugin repository.
pub(crate) fn cmd_add_plugin_repo(name: String, url: String, skip_ssl_validation: bool) -> Result<()> {
    let config = load_config(skip_ssl_validation)?;
    let mut actor = create_actor(&config)?;

    actor
        .add_plugin_repository(&name, &url)
        .with_context(|| format!("Failed to add plugin repository {}", name))?;

    let repository = actor.get_plugin_repository(&name)?;
    println!("{} added as {}", repository.url, repository.name);
    Ok(())
}

/// Deregister a plugin repository.
pub(crate) fn cmd_remove_plugin_repo(name: String) -> Result<()> {
    let config = load_config(false)?;
    let mut actor = create_actor(&config)?;

    actor
        .remove_plugin_repository(&name)
        .with_context(|| format!("Failed to remove plugin repository {}", name))?;

    println!("{} removed from list of repositories", name);
    Ok(())
}

/// List registered plugin repositories.
pub(crate) fn cmd_list_plugin_repos() -> Result<()> {
    let config = load_config(false)?;
    let actor = create_actor(&config)?;

    let repositories = actor.plugin_repositories();
    if repositories.is_empty() {
        println!("No plugin repositories registered.");
        return Ok(());
    }

    println!("{:<20} {}", "repo name", "url");
    for repository in repositories {
        println!("{:<20} {}", repository.name, repository.url);
    }
    Ok(())
}

/// List the plugins offered by repositories.
pub(crate) fn cmd_repo_plugins(repository: Option<String>) -> Result<()> {
    let config = load_config(false)?;
    let actor = create_actor(&config)?;

    let listing = actor.repository_plugins(repository.as_deref())?;
    let mut failures: Vec<(String, PlugError)> = Vec::new();

    for (repository_name, catalog) in listing {
        let catalog = match catalog {
            Ok(catalog) => catalog,
            Err(e) => {
                failures.push((repository_name, e));
                continue;
            }
        };

        println!("Repository: {}", repository_name);
        println!("{:<30} {:<10} {}", "name", "version", "description");
        for plugin in &catalog.plugins {
            println!(
                "{:<30} {:<10} {}",
                plugin.name, plugin.version, plugin.description
            );
        }
        println!();
    }

    if !failures.is_empty() {
        eprintln!("Logged errors:");
        for (repository_name, e) in &failures {
            eprintln!("  {}: {}", repository_name, e);
        }
    }
    Ok(())
}
