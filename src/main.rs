use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::plugin::{
    cmd_add_plugin_repo, cmd_install_plugin, cmd_list_plugin_repos, cmd_plugins,
    cmd_remove_plugin_repo, cmd_repo_plugins, cmd_uninstall_plugin,
};

#[derive(Parser)]
#[command(name = "plugctl")]
#[command(about = "Install and manage command-line plugins", long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a plugin from a local path, a URL or a plugin repository
    InstallPlugin {
        /// Plugin name, path to a binary, or http(s) URL
        target: String,
        /// Repository to install the plugin from
        #[arg(short = 'r', long = "repo")]
        repo: Option<String>,
        /// Skip the confirmation prompt and replace an installed plugin
        #[arg(short, long)]
        force: bool,
        /// Accept invalid TLS certificates
        #[arg(short = 'k', long = "skip-ssl-validation")]
        skip_ssl_validation: bool,
    },
    /// Uninstall a plugin
    UninstallPlugin {
        /// Name of the installed plugin
        name: String,
    },
    /// List installed plugins
    Plugins {
        /// Show the SHA-1 of each plugin binary
        #[arg(long)]
        checksum: bool,
        /// Show plugins with newer releases in registered repositories
        #[arg(long)]
        outdated: bool,
    },
    /// Register a plugin repository
    AddPluginRepo {
        /// Name for the repository
        name: String,
        /// Repository URL
        url: String,
        /// Accept invalid TLS certificates
        #[arg(short = 'k', long = "skip-ssl-validation")]
        skip_ssl_validation: bool,
    },
    /// Deregister a plugin repository
    RemovePluginRepo {
        /// Name of the repository
        name: String,
    },
    /// List registered plugin repositories
    ListPluginRepos,
    /// List plugins offered by registered repositories
    RepoPlugins {
        /// Only list this repository
        #[arg(short = 'r', long = "repo")]
        repo: Option<String>,
    },
    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Some(Commands::Version) | None => {
            println!("plugctl {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::InstallPlugin {
            target,
            repo,
            force,
            skip_ssl_validation,
        }) => cmd_install_plugin(target, repo, force, skip_ssl_validation)?,
        Some(Commands::UninstallPlugin { name }) => cmd_uninstall_plugin(name)?,
        Some(Commands::Plugins { checksum, outdated }) => cmd_plugins(checksum, outdated)?,
        Some(Commands::AddPluginRepo {
            name,
            url,
            skip_ssl_validation,
        }) => cmd_add_plugin_repo(name, url, skip_ssl_validation)?,
        Some(Commands::RemovePluginRepo { name }) => cmd_remove_plugin_repo(name)?,
        Some(Commands::ListPluginRepos) => cmd_list_plugin_repos()?,
        Some(Commands::RepoPlugins { repo }) => cmd_repo_plugins(repo)?,
    }

    Ok(())
}
