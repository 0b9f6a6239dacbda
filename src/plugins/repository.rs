//! Plugin repository client
//!
//! A plugin repository serves a [`RepositoryCatalog`] as JSON at
//! `<repository url>/list`, plus the binaries the catalog points at.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::http::{Connection, Request};

use super::types::RepositoryCatalog;

/// Access to remote plugin repositories.
#[cfg_attr(test, mockall::automock)]
pub trait RepositoryClient {
    /// Fetch and decode the catalog of the repository at `repository_url`.
    fn get_plugin_repository(&self, repository_url: &str) -> Result<RepositoryCatalog>;

    /// Download `url` into the file at `path`, replacing it.
    fn download_plugin(&self, url: &str, path: &Path) -> Result<()>;
}

/// The catalog URL for a repository URL: trailing slashes trimmed and
/// `/list` appended unless it is already the last segment.
pub fn catalog_url(repository_url: &str) -> String {
    let trimmed = repository_url.trim_end_matches('/');
    let after_scheme = trimmed
        .split_once("://")
        .map_or(trimmed, |(_, rest)| rest);
    let last_segment = after_scheme
        .split_once('/')
        .and_then(|(_, path)| path.rsplit('/').next());
    if last_segment == Some("list") {
        trimmed.to_string()
    } else {
        format!("{}/list", trimmed)
    }
}

/// [`RepositoryClient`] over a [`Connection`] stack.
#[derive(Debug, Clone)]
pub struct HttpRepositoryClient<C> {
    connection: C,
}

impl<C: Connection> HttpRepositoryClient<C> {
    pub fn new(connection: C) -> Self {
        Self { connection }
    }
}

impl<C: Connection> RepositoryClient for HttpRepositoryClient<C> {
    fn get_plugin_repository(&self, repository_url: &str) -> Result<RepositoryCatalog> {
        let url = catalog_url(repository_url);
        let response = self
            .connection
            .make(&Request::get(&url).with_header("Accept", "application/json"))?;
        let catalog: RepositoryCatalog = response.json()?;
        debug!(url = %url, plugins = catalog.plugins.len(), "Fetched repository catalog");
        Ok(catalog)
    }

    fn download_plugin(&self, url: &str, path: &Path) -> Result<()> {
        let response = self.connection.make(&Request::get(url))?;
        let mut file = File::create(path)?;
        file.write_all(&response.body)?;
        file.sync_all()?;
        debug!(url, path = %path.display(), bytes = response.body.len(), "Downloaded plugin binary");
        Ok(())
    }
}
