//! Plugin actor: the operations behind the plugin CLI commands
//!
//! `PluginActor` owns the registry and a repository client and strings the
//! resolver, validator, checksum gate, installer and uninstaller together.
//!
//! # Install pipeline
//!
//! ```text
//! source ──► staging copy ──► checksum ──► validate ──► replace old ──► install
//!  path       (temp dir in     (repository                 (uninstall
//!  url         plugin home)     sources only)               same name,
//!  repository                                               any case)
//! ```
//!
//! A downloaded release is never run before its checksum has been checked.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::commands::CommandList;
use crate::error::{PlugError, Result};

use super::checksum;
use super::host::PluginHost;
use super::installer;
use super::registry::PluginRegistry;
use super::repository::RepositoryClient;
use super::resolver;
use super::types::{OutdatedPlugin, Plugin, PluginInfo, PluginRepository, RepositoryCatalog};
use super::uninstaller::Uninstaller;
use super::validator;

static HTTP_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://").expect("static regex is valid"));

static ANY_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*://").expect("static regex is valid"));

/// Default scheme and no trailing slash.
pub fn normalize_repository_url(url: &str) -> String {
    let url = url.trim();
    let url = if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    };
    url.trim_end_matches('/').to_string()
}

/// Where `install-plugin` takes the binary from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSource {
    /// A file on disk.
    Path(PathBuf),
    /// An `http(s)` download.
    Url(String),
    /// A plugin in one named repository.
    Repository {
        plugin_name: String,
        repository_name: String,
    },
    /// A plugin in whichever registered repository has the newest release.
    AnyRepository(String),
}

impl InstallSource {
    fn is_repository(&self) -> bool {
        matches!(
            self,
            InstallSource::Repository { .. } | InstallSource::AnyRepository(_)
        )
    }
}

/// Switches for [`PluginActor::install`].
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Replace an installed plugin of the same name without asking.
    pub force: bool,
}

/// An installed plugin, optionally with the SHA-1 of its binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPlugin {
    pub plugin: Plugin,
    pub sha1: Option<String>,
}

/// Drives every plugin operation against one registry.
pub struct PluginActor<C> {
    registry: PluginRegistry,
    client: C,
    commands: Box<dyn CommandList>,
    uninstaller: Uninstaller,
    platform: String,
}

impl<C: RepositoryClient> PluginActor<C> {
    pub fn new(registry: PluginRegistry, client: C, commands: Box<dyn CommandList>) -> Self {
        Self {
            registry,
            client,
            commands,
            uninstaller: Uninstaller::default(),
            platform: resolver::current_platform(),
        }
    }

    pub fn with_uninstaller(mut self, uninstaller: Uninstaller) -> Self {
        self.uninstaller = uninstaller;
        self
    }

    /// Override the platform used to pick binaries.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    // ---- repositories ----

    /// The registered repository called `name`, ignoring case.
    pub fn get_plugin_repository(&self, name: &str) -> Result<PluginRepository> {
        self.registry
            .plugin_repositories()
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| PlugError::RepositoryNotRegistered {
                repository_name: name.to_string(),
            })
    }

    pub fn plugin_repositories(&self) -> &[PluginRepository] {
        self.registry.plugin_repositories()
    }

    /// Register a repository after checking it serves a catalog.
    ///
    /// Registering the same name and URL again is a no-op.
    pub fn add_plugin_repository(&mut self, name: &str, url: &str) -> Result<()> {
        let url = normalize_repository_url(url);

        for existing in self.registry.plugin_repositories() {
            let same_name = existing.name.eq_ignore_ascii_case(name);
            let same_url = existing.url.eq_ignore_ascii_case(&url);
            if same_name && same_url {
                debug!(repository = name, url = %url, "Repository already registered");
                return Ok(());
            }
            if same_name {
                return Err(PlugError::RepositoryNameTaken {
                    name: existing.name.clone(),
                });
            }
            if same_url {
                return Err(PlugError::RepositoryUrlTaken {
                    name: existing.name.clone(),
                    url: existing.url.clone(),
                });
            }
        }

        self.client
            .get_plugin_repository(&url)
            .map_err(|e| PlugError::AddPluginRepository {
                name: name.to_string(),
                url: url.clone(),
                source: Box::new(e),
            })?;

        self.registry.add_plugin_repository(name, &url);
        self.registry.write_plugin_config()?;
        info!(repository = name, url = %url, "Added plugin repository");
        Ok(())
    }

    /// Deregister a repository, ignoring case.
    pub fn remove_plugin_repository(&mut self, name: &str) -> Result<()> {
        if !self.registry.remove_plugin_repository(name) {
            return Err(PlugError::RepositoryNotRegistered {
                repository_name: name.to_string(),
            });
        }
        self.registry.write_plugin_config()?;
        info!(repository = name, "Removed plugin repository");
        Ok(())
    }

    /// Catalog of each repository, or of just `repository_name` when given.
    pub fn repository_plugins(
        &self,
        repository_name: Option<&str>,
    ) -> Result<Vec<(String, Result<RepositoryCatalog>)>> {
        let repositories = match repository_name {
            Some(name) => vec![self.get_plugin_repository(name)?],
            None => self.registry.plugin_repositories().to_vec(),
        };
        Ok(resolver::repository_plugins(&self.client, &repositories))
    }

    // ---- installed plugins ----

    /// Installed plugins sorted case-insensitively by name.
    pub fn plugins(&self, with_checksum: bool) -> Vec<InstalledPlugin> {
        self.registry
            .plugins()
            .into_iter()
            .map(|plugin| {
                let sha1 = with_checksum.then(|| plugin.calculate_sha1());
                InstalledPlugin { plugin, sha1 }
            })
            .collect()
    }

    pub fn outdated_plugins(&self) -> Result<Vec<OutdatedPlugin>> {
        resolver::outdated(
            &self.client,
            &self.registry.plugins(),
            self.registry.plugin_repositories(),
        )
    }

    pub fn resolve_from_repositories(
        &self,
        plugin_name: &str,
        repositories: &[PluginRepository],
        platform: &str,
    ) -> Result<(PluginInfo, Vec<String>)> {
        resolver::resolve(&self.client, plugin_name, repositories, platform)
    }

    // ---- install / uninstall ----

    /// Work out what the `install-plugin` argument refers to.
    pub fn detect_source(&self, arg: &str, repository: Option<&str>) -> Result<InstallSource> {
        if let Some(repository_name) = repository {
            return Ok(InstallSource::Repository {
                plugin_name: arg.to_string(),
                repository_name: repository_name.to_string(),
            });
        }

        let path = Path::new(arg);
        if installer::file_exists(path) {
            return Ok(InstallSource::Path(path.to_path_buf()));
        }
        if HTTP_URL.is_match(arg) {
            return Ok(InstallSource::Url(arg.to_string()));
        }
        if ANY_URL.is_match(arg) {
            return Err(PlugError::UnsupportedUrlScheme {
                url: arg.to_string(),
            });
        }
        if self.registry.plugin_repositories().is_empty() {
            return Err(PlugError::PluginNotFoundOnDiskOrInAnyRepository {
                plugin_name: arg.to_string(),
            });
        }
        Ok(InstallSource::AnyRepository(arg.to_string()))
    }

    pub fn install_from_path<H: PluginHost + ?Sized>(
        &mut self,
        host: &H,
        path: &Path,
        options: InstallOptions,
    ) -> Result<Plugin> {
        self.install(host, &InstallSource::Path(path.to_path_buf()), options)
    }

    pub fn install_from_url<H: PluginHost + ?Sized>(
        &mut self,
        host: &H,
        url: &str,
        options: InstallOptions,
    ) -> Result<Plugin> {
        self.install(host, &InstallSource::Url(url.to_string()), options)
    }

    pub fn install_from_repository<H: PluginHost + ?Sized>(
        &mut self,
        host: &H,
        plugin_name: &str,
        repository_name: &str,
        options: InstallOptions,
    ) -> Result<Plugin> {
        let source = InstallSource::Repository {
            plugin_name: plugin_name.to_string(),
            repository_name: repository_name.to_string(),
        };
        self.install(host, &source, options)
    }

    pub fn install_from_any_repository<H: PluginHost + ?Sized>(
        &mut self,
        host: &H,
        plugin_name: &str,
        options: InstallOptions,
    ) -> Result<Plugin> {
        self.install(host, &InstallSource::AnyRepository(plugin_name.to_string()), options)
    }

    /// Run the install pipeline for `source`. Returns the installed plugin.
    pub fn install<H: PluginHost + ?Sized>(
        &mut self,
        host: &H,
        source: &InstallSource,
        options: InstallOptions,
    ) -> Result<Plugin> {
        std::fs::create_dir_all(self.registry.plugin_home())?;
        let staging = tempfile::Builder::new()
            .prefix("staging")
            .tempdir_in(self.registry.plugin_home())?;

        let candidate = self.fetch_candidate(source, staging.path())?;

        let mut plugin = validator::validate(
            host,
            self.commands.as_ref(),
            &self.registry.plugins(),
            &candidate,
        )?;

        let installed = self
            .registry
            .get_plugin_case_insensitive(&plugin.name)
            .map(|p| p.name.clone());
        if let Some(installed) = installed {
            if !options.force && !source.is_repository() {
                return Err(PlugError::PluginAlreadyInstalled {
                    name: plugin.name,
                    version: plugin.version.to_string(),
                });
            }
            info!(plugin = %plugin.name, replaces = %installed, "Replacing installed plugin");
            match self.uninstaller.uninstall(&mut self.registry, host, &installed) {
                Ok(()) => {}
                Err(e) if e.is_warning() => {
                    warn!(plugin = %installed, error = %e, "Old plugin removed with warnings")
                }
                Err(e) => return Err(e),
            }
        }

        installer::install(&mut self.registry, &candidate, &mut plugin)?;
        Ok(plugin)
    }

    /// Stage the binary for `source` in `staging`.
    fn fetch_candidate(&self, source: &InstallSource, staging: &Path) -> Result<PathBuf> {
        match source {
            InstallSource::Path(path) => installer::create_executable_copy(path, staging),
            InstallSource::Url(url) => {
                installer::download_executable_binary(&self.client, url, staging)
            }
            InstallSource::Repository {
                plugin_name,
                repository_name,
            } => {
                let repository = self.get_plugin_repository(repository_name)?;
                let (info, _) = resolver::resolve(
                    &self.client,
                    plugin_name,
                    std::slice::from_ref(&repository),
                    &self.platform,
                )
                .map_err(|e| match e {
                    PlugError::PluginNotFoundInAnyRepository { .. } => {
                        PlugError::PluginNotFoundInRepository {
                            plugin_name: plugin_name.clone(),
                            repository_name: repository.name.clone(),
                        }
                    }
                    other => other,
                })?;
                self.download_release(&info, staging)
            }
            InstallSource::AnyRepository(plugin_name) => {
                let (info, repos) = resolver::resolve(
                    &self.client,
                    plugin_name,
                    self.registry.plugin_repositories(),
                    &self.platform,
                )
                .map_err(|e| match e {
                    PlugError::PluginNotFoundInAnyRepository { .. } => {
                        PlugError::PluginNotFoundOnDiskOrInAnyRepository {
                            plugin_name: plugin_name.clone(),
                        }
                    }
                    other => other,
                })?;
                debug!(plugin = %plugin_name, repositories = ?repos, "Installing from repository");
                self.download_release(&info, staging)
            }
        }
    }

    /// Download a resolved release and check it against the catalog checksum.
    fn download_release(&self, info: &PluginInfo, staging: &Path) -> Result<PathBuf> {
        info!(plugin = %info.name, version = %info.version, url = %info.url, "Downloading plugin");
        let path = installer::download_executable_binary(&self.client, &info.url, staging)?;
        if !checksum::matches(&path, &info.checksum) {
            warn!(plugin = %info.name, url = %info.url, "Downloaded plugin failed checksum verification");
            return Err(PlugError::InvalidChecksum);
        }
        Ok(path)
    }

    /// Uninstall `name`. See [`Uninstaller::uninstall`] for the warning
    /// outcomes.
    pub fn uninstall_plugin<H: PluginHost + ?Sized>(&mut self, host: &H, name: &str) -> Result<()> {
        self.uninstaller.uninstall(&mut self.registry, host, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::BuiltinCommands;
    use crate::plugins::host::MockPluginHost;
    use crate::plugins::repository::MockRepositoryClient;
    use crate::plugins::types::{CatalogBinary, CatalogPlugin, PluginCommand, PluginVersion};
    use crate::utils::retry::{Backoff, RetryPolicy};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    const FOO_SHA1: &str = "0beec7b5ea3f0fdbc95d0dd47f3c5bc275da8a33";

    fn actor(home: &Path, client: MockRepositoryClient) -> PluginActor<MockRepositoryClient> {
        PluginActor::new(
            PluginRegistry::new(home),
            client,
            Box::new(BuiltinCommands::from_pairs([("version", ""), ("push", "p")])),
        )
        .with_platform("linux64")
        .with_uninstaller(
            Uninstaller::new()
                .with_grace_period(Duration::ZERO)
                .with_remove_policy(RetryPolicy::new(2, Backoff::None)),
        )
    }

    fn describing(name: &'static str, version: PluginVersion) -> MockPluginHost {
        let mut host = MockPluginHost::new();
        host.expect_describe().returning(move |_| {
            Ok(Plugin {
                name: name.to_string(),
                version,
                location: PathBuf::new(),
                commands: vec![PluginCommand::new(name, "")],
            })
        });
        host.expect_invoke().returning(|_, _| Ok(()));
        host
    }

    fn catalog_with(name: &str, version: &str, checksum: &str) -> RepositoryCatalog {
        RepositoryCatalog {
            plugins: vec![CatalogPlugin {
                name: name.to_string(),
                version: version.to_string(),
                binaries: vec![CatalogBinary {
                    platform: "linux64".into(),
                    url: format!("https://dl.example.com/{}", name),
                    checksum: checksum.to_string(),
                }],
                ..Default::default()
            }],
        }
    }

    /// Client whose every repository serves `catalog` and whose downloads
    /// write "foo".
    fn serving(catalog: RepositoryCatalog) -> MockRepositoryClient {
        let mut client = MockRepositoryClient::new();
        client
            .expect_get_plugin_repository()
            .returning(move |_| Ok(catalog.clone()));
        client.expect_download_plugin().returning(|_, path| {
            fs::write(path, "foo")?;
            Ok(())
        });
        client
    }

    #[test]
    fn test_normalize_repository_url() {
        assert_eq!(normalize_repository_url("repo.example.com/"), "https://repo.example.com");
        assert_eq!(normalize_repository_url("http://repo.example.com//"), "http://repo.example.com");
        assert_eq!(normalize_repository_url(" https://x.io "), "https://x.io");
    }

    #[test]
    fn test_add_repository_normalizes_and_persists() {
        let tmp = TempDir::new().unwrap();
        let mut client = MockRepositoryClient::new();
        client
            .expect_get_plugin_repository()
            .withf(|url| url == "https://repo.example.com")
            .times(1)
            .returning(|_| Ok(RepositoryCatalog::default()));

        let mut actor = actor(tmp.path(), client);
        actor.add_plugin_repository("mine", "repo.example.com/").unwrap();

        let reloaded = PluginRegistry::load(tmp.path()).unwrap();
        let repo = reloaded.plugin_repositories().last().unwrap().clone();
        assert_eq!(repo, PluginRepository::new("mine", "https://repo.example.com"));
    }

    #[test]
    fn test_add_repository_duplicates() {
        let tmp = TempDir::new().unwrap();
        let mut client = MockRepositoryClient::new();
        client
            .expect_get_plugin_repository()
            .times(1)
            .returning(|_| Ok(RepositoryCatalog::default()));
        let mut actor = actor(tmp.path(), client);
        actor.add_plugin_repository("mine", "https://repo.example.com").unwrap();

        // Same pair again: nothing to do, no fetch.
        actor.add_plugin_repository("MINE", "https://repo.example.com/").unwrap();

        let err = actor
            .add_plugin_repository("Mine", "https://elsewhere.example.com")
            .unwrap_err();
        assert!(matches!(err, PlugError::RepositoryNameTaken { .. }));

        let err = actor
            .add_plugin_repository("other", "https://repo.example.com")
            .unwrap_err();
        match err {
            PlugError::RepositoryUrlTaken { name, .. } => assert_eq!(name, "mine"),
            other => panic!("expected url taken, got {:?}", other),
        }
    }

    #[test]
    fn test_add_repository_that_does_not_answer() {
        let tmp = TempDir::new().unwrap();
        let mut client = MockRepositoryClient::new();
        client.expect_get_plugin_repository().returning(|_| {
            Err(PlugError::RawHttpStatus {
                status: 404,
                body: String::new(),
            })
        });
        let mut actor = actor(tmp.path(), client);

        let err = actor
            .add_plugin_repository("bad", "https://bad.example.com")
            .unwrap_err();
        assert!(matches!(err, PlugError::AddPluginRepository { .. }));
        assert_eq!(err.http_status(), Some(404));
        assert_eq!(actor.plugin_repositories().len(), 1);
    }

    #[test]
    fn test_get_and_remove_repository_ignore_case() {
        let tmp = TempDir::new().unwrap();
        let mut actor = actor(tmp.path(), MockRepositoryClient::new());

        assert_eq!(actor.get_plugin_repository("cf-community").unwrap().name, "CF-Community");
        actor.remove_plugin_repository("cf-COMMUNITY").unwrap();

        let err = actor.get_plugin_repository("CF-Community").unwrap_err();
        assert!(matches!(err, PlugError::RepositoryNotRegistered { .. }));
        assert!(matches!(
            actor.remove_plugin_repository("CF-Community").unwrap_err(),
            PlugError::RepositoryNotRegistered { .. }
        ));
    }

    #[test]
    fn test_detect_source() {
        let tmp = TempDir::new().unwrap();
        let local = tmp.path().join("local-plugin");
        fs::write(&local, "x").unwrap();
        let actor = actor(tmp.path(), MockRepositoryClient::new());

        assert_eq!(
            actor.detect_source(local.to_str().unwrap(), None).unwrap(),
            InstallSource::Path(local.clone())
        );
        assert_eq!(
            actor.detect_source("HTTPS://dl.example.com/p", None).unwrap(),
            InstallSource::Url("HTTPS://dl.example.com/p".into())
        );
        assert!(matches!(
            actor.detect_source("ftp://dl.example.com/p", None).unwrap_err(),
            PlugError::UnsupportedUrlScheme { .. }
        ));
        assert_eq!(
            actor.detect_source("echo", None).unwrap(),
            InstallSource::AnyRepository("echo".into())
        );
        assert_eq!(
            actor.detect_source("echo", Some("CF-Community")).unwrap(),
            InstallSource::Repository {
                plugin_name: "echo".into(),
                repository_name: "CF-Community".into()
            }
        );
    }

    #[test]
    fn test_detect_source_without_repositories() {
        let tmp = TempDir::new().unwrap();
        let mut actor = actor(tmp.path(), MockRepositoryClient::new());
        actor.remove_plugin_repository("CF-Community").unwrap();

        let err = actor.detect_source("echo", None).unwrap_err();
        assert!(matches!(err, PlugError::PluginNotFoundOnDiskOrInAnyRepository { .. }));
    }

    #[test]
    fn test_install_from_path_then_refuse_without_force() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("echo-bin");
        fs::write(&source, "foo").unwrap();
        let home = tmp.path().join("home");
        let mut actor = actor(&home, MockRepositoryClient::new());
        let host = describing("echo", PluginVersion::new(1, 0, 0));

        let plugin = actor
            .install_from_path(&host, &source, InstallOptions::default())
            .unwrap();
        assert!(plugin.location.starts_with(&home));
        assert_eq!(actor.plugins(true)[0].sha1.as_deref(), Some(FOO_SHA1));

        let err = actor
            .install_from_path(&host, &source, InstallOptions::default())
            .unwrap_err();
        assert!(matches!(err, PlugError::PluginAlreadyInstalled { .. }));

        actor
            .install_from_path(&host, &source, InstallOptions { force: true })
            .unwrap();
        assert_eq!(actor.registry().plugin_count(), 1);
        assert!(actor.registry().get_plugin("echo").unwrap().location.exists());
    }

    #[test]
    fn test_staging_dir_is_cleaned_up() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("echo-bin");
        fs::write(&source, "foo").unwrap();
        let home = tmp.path().join("home");
        let mut actor = actor(&home, MockRepositoryClient::new());
        let host = describing("echo", PluginVersion::new(1, 0, 0));

        actor
            .install_from_path(&host, &source, InstallOptions::default())
            .unwrap();
        let leftovers = fs::read_dir(&home)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("staging"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_install_from_repository_verifies_checksum() {
        let tmp = TempDir::new().unwrap();
        let mut actor = actor(tmp.path(), serving(catalog_with("echo", "1.0.0", FOO_SHA1)));
        let host = describing("echo", PluginVersion::new(1, 0, 0));

        let plugin = actor
            .install_from_repository(&host, "echo", "cf-community", InstallOptions::default())
            .unwrap();
        assert_eq!(plugin.name, "echo");
        assert_eq!(fs::read(&plugin.location).unwrap(), b"foo");
    }

    #[test]
    fn test_install_from_repository_bad_checksum() {
        let tmp = TempDir::new().unwrap();
        let mut actor = actor(tmp.path(), serving(catalog_with("echo", "1.0.0", "deadbeef")));
        let host = describing("echo", PluginVersion::new(1, 0, 0));

        let err = actor
            .install_from_any_repository(&host, "echo", InstallOptions::default())
            .unwrap_err();
        assert!(matches!(err, PlugError::InvalidChecksum));
        assert_eq!(actor.registry().plugin_count(), 0);
    }

    #[test]
    fn test_bad_checksum_is_rejected_before_the_binary_runs() {
        let tmp = TempDir::new().unwrap();
        let mut actor = actor(tmp.path(), serving(catalog_with("echo", "1.0.0", "deadbeef")));
        // No expectations: describing or invoking the download would panic.
        let host = MockPluginHost::new();

        let err = actor
            .install_from_repository(&host, "echo", "CF-Community", InstallOptions::default())
            .unwrap_err();
        assert!(matches!(err, PlugError::InvalidChecksum));
        assert_eq!(actor.registry().plugin_count(), 0);
    }

    #[test]
    fn test_installed_plugin_is_matched_ignoring_case() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("echo-bin");
        fs::write(&source, "foo").unwrap();
        let mut actor = actor(&tmp.path().join("home"), MockRepositoryClient::new());

        let lower = describing("echo", PluginVersion::new(1, 0, 0));
        actor
            .install_from_path(&lower, &source, InstallOptions::default())
            .unwrap();

        let mut upper = MockPluginHost::new();
        upper.expect_describe().returning(|_| {
            Ok(Plugin {
                name: "Echo".into(),
                version: PluginVersion::new(2, 0, 0),
                location: PathBuf::new(),
                commands: vec![PluginCommand::new("shout", "")],
            })
        });
        upper.expect_invoke().returning(|_, _| Ok(()));

        let err = actor
            .install_from_path(&upper, &source, InstallOptions::default())
            .unwrap_err();
        assert!(matches!(err, PlugError::PluginAlreadyInstalled { ref name, .. } if name == "Echo"));
        assert_eq!(actor.registry().plugin_count(), 1);

        actor
            .install_from_path(&upper, &source, InstallOptions { force: true })
            .unwrap();
        assert_eq!(actor.registry().plugin_count(), 1);
        assert!(actor.registry().get_plugin("echo").is_none());
        assert_eq!(
            actor.registry().get_plugin("Echo").unwrap().version,
            PluginVersion::new(2, 0, 0)
        );
    }

    #[test]
    fn test_repository_upgrade_does_not_need_force() {
        let tmp = TempDir::new().unwrap();
        let mut actor = actor(tmp.path(), serving(catalog_with("echo", "2.0.0", FOO_SHA1)));

        let old = describing("echo", PluginVersion::new(1, 0, 0));
        let source = tmp.path().join("old-echo");
        fs::write(&source, "old").unwrap();
        actor
            .install_from_path(&old, &source, InstallOptions::default())
            .unwrap();

        let new = describing("echo", PluginVersion::new(2, 0, 0));
        actor
            .install_from_any_repository(&new, "echo", InstallOptions::default())
            .unwrap();
        assert_eq!(
            actor.registry().get_plugin("echo").unwrap().version,
            PluginVersion::new(2, 0, 0)
        );
    }

    #[test]
    fn test_install_missing_from_named_repository() {
        let tmp = TempDir::new().unwrap();
        let mut actor = actor(tmp.path(), serving(catalog_with("other", "1.0.0", FOO_SHA1)));
        let host = MockPluginHost::new();

        match actor
            .install_from_repository(&host, "echo", "CF-Community", InstallOptions::default())
            .unwrap_err()
        {
            PlugError::PluginNotFoundInRepository {
                plugin_name,
                repository_name,
            } => {
                assert_eq!(plugin_name, "echo");
                assert_eq!(repository_name, "CF-Community");
            }
            other => panic!("unexpected {:?}", other),
        }

        let err = actor
            .install_from_any_repository(&host, "echo", InstallOptions::default())
            .unwrap_err();
        assert!(matches!(err, PlugError::PluginNotFoundOnDiskOrInAnyRepository { .. }));
    }

    #[test]
    fn test_install_then_uninstall() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("echo-bin");
        fs::write(&source, "foo").unwrap();
        let mut actor = actor(&tmp.path().join("home"), MockRepositoryClient::new());
        let host = describing("echo", PluginVersion::new(1, 0, 0));

        let plugin = actor
            .install_from_path(&host, &source, InstallOptions::default())
            .unwrap();
        actor.uninstall_plugin(&host, "echo").unwrap();

        assert!(actor.registry().get_plugin("echo").is_none());
        assert!(!plugin.location.exists());
        assert!(actor.plugins(false).is_empty());
    }

    #[test]
    fn test_outdated_plugins() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("echo-bin");
        fs::write(&source, "foo").unwrap();
        let mut actor = actor(
            &tmp.path().join("home"),
            serving(catalog_with("echo", "1.2.0", FOO_SHA1)),
        );
        let host = describing("echo", PluginVersion::new(1, 0, 0));
        actor
            .install_from_path(&host, &source, InstallOptions::default())
            .unwrap();

        let report = actor.outdated_plugins().unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].current_version, "1.0.0");
        assert_eq!(report[0].latest_version, "1.2.0");
    }
}
