//! Installing plugin binaries into the plugin home.
//!
//! Errors from copying and changing permissions are returned as the raw
//! [`std::io::Error`] inside [`PlugError::Io`], so callers can tell a
//! missing source from a permission problem by its `ErrorKind`.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{PlugError, Result};

use super::registry::PluginRegistry;
use super::repository::RepositoryClient;
use super::types::Plugin;

/// Owner read/write/execute.
#[cfg(unix)]
const EXECUTABLE_MODE: u32 = 0o700;

/// File name used for the installed copy of `source_path`.
fn installed_file_name(source_path: &Path) -> io::Result<OsString> {
    let name = source_path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", source_path.display()),
        )
    })?;

    #[cfg(windows)]
    {
        let has_exe = Path::new(name)
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("exe"))
            .unwrap_or(false);
        if !has_exe {
            let mut with_ext = name.to_os_string();
            with_ext.push(".exe");
            return Ok(with_ext);
        }
    }

    Ok(name.to_os_string())
}

fn make_executable(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(EXECUTABLE_MODE))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Copy `source_path` into `dir` under its own name and make it executable.
fn copy_executable(source_path: &Path, dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let target = dir.join(installed_file_name(source_path)?);
    fs::copy(source_path, &target)?;
    make_executable(&target)?;
    Ok(target)
}

/// Install a validated binary.
///
/// Copies `source_path` into the plugin home, records the copy as
/// `plugin.location`, upserts the plugin by name and rewrites the registry.
/// A failed rewrite leaves the copied binary in place.
pub fn install(registry: &mut PluginRegistry, source_path: &Path, plugin: &mut Plugin) -> Result<()> {
    let location = copy_executable(source_path, registry.plugin_home()).map_err(PlugError::Io)?;
    debug!(from = %source_path.display(), to = %location.display(), "Copied plugin binary");

    plugin.location = location;
    registry.add_plugin(plugin.clone());
    registry.write_plugin_config()?;

    info!(plugin = %plugin.name, version = %plugin.version, "Installed plugin");
    Ok(())
}

/// Copy a candidate into `temp_dir` with execute permission so it can be
/// introspected wherever it came from.
pub fn create_executable_copy(path: &Path, temp_dir: &Path) -> Result<PathBuf> {
    Ok(copy_executable(path, temp_dir)?)
}

/// Last path segment of `url`, ignoring query and fragment.
fn download_file_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let path = path.split_once("://").map(|(_, rest)| rest).unwrap_or(path);
    match path.trim_end_matches('/').rsplit_once('/') {
        Some((_, name)) if !name.is_empty() => name.to_string(),
        _ => "plugin".to_string(),
    }
}

/// Download `url` into `temp_dir` and make it executable.
pub fn download_executable_binary<C: RepositoryClient + ?Sized>(
    client: &C,
    url: &str,
    temp_dir: &Path,
) -> Result<PathBuf> {
    fs::create_dir_all(temp_dir)?;
    let target = temp_dir.join(download_file_name(url));
    client.download_plugin(url, &target)?;
    make_executable(&target)?;
    info!(url, path = %target.display(), "Downloaded plugin");
    Ok(target)
}

/// Whether `path` names an existing regular file.
pub fn file_exists(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::repository::MockRepositoryClient;
    use crate::plugins::types::{PluginCommand, PluginVersion};
    use tempfile::TempDir;

    fn candidate() -> Plugin {
        Plugin {
            name: "echo".into(),
            version: PluginVersion::new(1, 2, 3),
            location: PathBuf::new(),
            commands: vec![PluginCommand::new("echo", "e")],
        }
    }

    #[test]
    fn test_install_then_lookup() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("echo-plugin");
        fs::write(&source, b"binary bytes").unwrap();

        let home = tmp.path().join("home");
        let mut registry = PluginRegistry::new(&home);
        let mut plugin = candidate();
        install(&mut registry, &source, &mut plugin).unwrap();

        let expected_name = installed_file_name(&source).unwrap();
        let expected = home.join(expected_name);
        assert_eq!(plugin.location, expected);
        assert_eq!(fs::read(&expected).unwrap(), b"binary bytes");

        let reloaded = PluginRegistry::load(&home).unwrap();
        let stored = reloaded.get_plugin("echo").unwrap();
        assert_eq!(stored.location, expected);
        assert_eq!(stored.version, plugin.version);
        assert_eq!(stored.commands, plugin.commands);
    }

    #[cfg(unix)]
    #[test]
    fn test_install_sets_owner_only_executable_mode() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("echo-plugin");
        fs::write(&source, b"x").unwrap();
        fs::set_permissions(&source, fs::Permissions::from_mode(0o644)).unwrap();

        let mut registry = PluginRegistry::new(tmp.path().join("home"));
        let mut plugin = candidate();
        install(&mut registry, &source, &mut plugin).unwrap();

        let mode = fs::metadata(&plugin.location).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn test_missing_source_keeps_not_found_kind() {
        let tmp = TempDir::new().unwrap();
        let mut registry = PluginRegistry::new(tmp.path().join("home"));
        let mut plugin = candidate();

        let err = install(&mut registry, &tmp.path().join("nope"), &mut plugin).unwrap_err();
        match err {
            PlugError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            other => panic!("expected Io, got {:?}", other),
        }
        assert!(registry.get_plugin("echo").is_none());
    }

    #[test]
    fn test_reinstall_replaces_entry() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("echo-plugin");
        fs::write(&source, b"v1").unwrap();
        let mut registry = PluginRegistry::new(tmp.path().join("home"));

        let mut first = candidate();
        install(&mut registry, &source, &mut first).unwrap();

        fs::write(&source, b"v2").unwrap();
        let mut second = candidate();
        second.version = PluginVersion::new(2, 0, 0);
        install(&mut registry, &source, &mut second).unwrap();

        assert_eq!(registry.plugin_count(), 1);
        assert_eq!(
            registry.get_plugin("echo").unwrap().version,
            PluginVersion::new(2, 0, 0)
        );
        assert_eq!(fs::read(&second.location).unwrap(), b"v2");
    }

    #[test]
    fn test_create_executable_copy() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("candidate");
        fs::write(&source, b"bytes").unwrap();

        let copy = create_executable_copy(&source, &tmp.path().join("staging")).unwrap();
        assert!(file_exists(&copy));
        assert_eq!(fs::read(&copy).unwrap(), b"bytes");
    }

    #[test]
    fn test_download_executable_binary_uses_url_file_name() {
        let mut client = MockRepositoryClient::new();
        client
            .expect_download_plugin()
            .withf(|url, path| {
                url == "https://dl.example.com/bin/echo-linux64?sig=abc"
                    && path.file_name().unwrap() == "echo-linux64"
            })
            .times(1)
            .returning(|_, path| {
                fs::write(path, b"downloaded")?;
                Ok(())
            });

        let tmp = TempDir::new().unwrap();
        let path = download_executable_binary(
            &client,
            "https://dl.example.com/bin/echo-linux64?sig=abc",
            tmp.path(),
        )
        .unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"downloaded");
    }

    #[test]
    fn test_download_file_name() {
        assert_eq!(download_file_name("https://x.com/a/b/tool"), "tool");
        assert_eq!(download_file_name("https://x.com/a/tool.exe#frag"), "tool.exe");
        assert_eq!(download_file_name("https://x.com"), "plugin");
        assert_eq!(download_file_name("https://x.com/"), "plugin");
    }

    #[test]
    fn test_file_exists() {
        let tmp = TempDir::new().unwrap();
        assert!(!file_exists(tmp.path()));
        assert!(!file_exists(&tmp.path().join("missing")));
    }
}
