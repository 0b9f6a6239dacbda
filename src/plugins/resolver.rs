//! Version resolution across plugin repositories
//!
//! Merges the catalogs of the registered repositories into one download
//! candidate for a plugin, reports installed plugins that have newer
//! releases, and maps the running host onto catalog platform names.
//!
//! Versions are compared as semantic versions. A version that does not
//! parse is never newer than anything and nothing is newer than it, so a
//! malformed entry keeps whatever position it reached first.

use std::collections::HashMap;

use semver::Version;
use tracing::debug;

use crate::error::{PlugError, Result};

use super::repository::RepositoryClient;
use super::types::{OutdatedPlugin, Plugin, PluginInfo, PluginRepository, RepositoryCatalog};

/// Whether `candidate` is strictly newer than `current`. `false` whenever
/// either side is not a valid semantic version.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    match (Version::parse(candidate), Version::parse(current)) {
        (Ok(candidate), Ok(current)) => candidate > current,
        _ => false,
    }
}

fn same_version(a: &str, b: &str) -> bool {
    match (Version::parse(a), Version::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Catalog platform name for an OS/architecture pair as reported by
/// `std::env::consts`.
pub fn platform_string(os: &str, arch: &str) -> String {
    match (os, arch) {
        ("macos", _) => "osx".to_string(),
        ("linux", "x86") => "linux32".to_string(),
        ("linux", "aarch64") => "linuxarm64".to_string(),
        ("linux", _) => "linux64".to_string(),
        ("windows", "x86") => "win32".to_string(),
        ("windows", _) => "win64".to_string(),
        (os, arch) => format!("{}-{}", os, arch),
    }
}

/// Platform name of the running host.
pub fn current_platform() -> String {
    platform_string(std::env::consts::OS, std::env::consts::ARCH)
}

fn fetch<C: RepositoryClient + ?Sized>(
    client: &C,
    repository: &PluginRepository,
) -> Result<RepositoryCatalog> {
    client
        .get_plugin_repository(&repository.url)
        .map_err(|e| PlugError::FetchingPluginInfoFromRepository {
            repository_name: repository.name.clone(),
            source: Box::new(e),
        })
}

/// Pick the newest release of `plugin_name` with a binary for `platform`.
///
/// Returns the candidate and the names of every repository offering exactly
/// that version, in registration order. The first failing catalog fetch
/// aborts the resolution.
pub fn resolve<C: RepositoryClient + ?Sized>(
    client: &C,
    plugin_name: &str,
    repositories: &[PluginRepository],
    platform: &str,
) -> Result<(PluginInfo, Vec<String>)> {
    let mut best: Option<(PluginInfo, Vec<String>)> = None;
    let mut incompatible_seen = false;

    for repository in repositories {
        let catalog = fetch(client, repository)?;

        for entry in catalog.plugins.iter().filter(|p| p.name == plugin_name) {
            let binary = match entry.binary_for(platform) {
                Some(binary) => binary,
                None => {
                    incompatible_seen = true;
                    continue;
                }
            };

            let candidate = PluginInfo {
                name: entry.name.clone(),
                version: entry.version.clone(),
                url: binary.url.clone(),
                checksum: binary.checksum.clone(),
            };

            match &mut best {
                None => best = Some((candidate, vec![repository.name.clone()])),
                Some((current, repos)) => {
                    if is_newer(&candidate.version, &current.version) {
                        *current = candidate;
                        *repos = vec![repository.name.clone()];
                    } else if same_version(&candidate.version, &current.version)
                        && !repos.contains(&repository.name)
                    {
                        repos.push(repository.name.clone());
                    }
                }
            }
        }
    }

    match best {
        Some((info, repos)) => {
            debug!(plugin = plugin_name, version = %info.version, repositories = ?repos, "Resolved plugin");
            Ok((info, repos))
        }
        None if incompatible_seen => Err(PlugError::NoCompatibleBinary),
        None => Err(PlugError::PluginNotFoundInAnyRepository {
            plugin_name: plugin_name.to_string(),
        }),
    }
}

/// Installed plugins for which some repository lists a strictly newer
/// version, sorted by name. When several repositories do, the newest wins.
pub fn outdated<C: RepositoryClient + ?Sized>(
    client: &C,
    installed: &[Plugin],
    repositories: &[PluginRepository],
) -> Result<Vec<OutdatedPlugin>> {
    let current: HashMap<&str, String> = installed
        .iter()
        .map(|p| (p.name.as_str(), p.version.to_string()))
        .collect();
    let mut newest: HashMap<String, String> = HashMap::new();

    for repository in repositories {
        let catalog = fetch(client, repository)?;
        for entry in &catalog.plugins {
            let Some(installed_version) = current.get(entry.name.as_str()) else {
                continue;
            };
            if !is_newer(&entry.version, installed_version) {
                continue;
            }
            let replace = match newest.get(&entry.name) {
                Some(seen) => is_newer(&entry.version, seen),
                None => true,
            };
            if replace {
                newest.insert(entry.name.clone(), entry.version.clone());
            }
        }
    }

    let mut report: Vec<OutdatedPlugin> = newest
        .into_iter()
        .map(|(name, latest_version)| OutdatedPlugin {
            current_version: current[name.as_str()].clone(),
            name,
            latest_version,
        })
        .collect();
    report.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(report)
}

/// Catalog of every repository. A failing repository does not hide the
/// others; its error is reported in place.
pub fn repository_plugins<C: RepositoryClient + ?Sized>(
    client: &C,
    repositories: &[PluginRepository],
) -> Vec<(String, Result<RepositoryCatalog>)> {
    repositories
        .iter()
        .map(|repository| (repository.name.clone(), fetch(client, repository)))
        .collect()
}
