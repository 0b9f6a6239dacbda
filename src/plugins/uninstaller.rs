//! Uninstalling plugins
//!
//! Deregistration always wins over a clean filesystem. Once the plugin's
//! uninstall hook has run (or could not be started), the registry entry is
//! removed even if the hook failed or the binary cannot be deleted; those
//! two outcomes are reported afterwards as warnings (see
//! [`PlugError::is_warning`]). Any other hook failure aborts before the
//! registry is touched.

use std::fs;
use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{PlugError, Result};
use crate::utils::retry::{retry, Backoff, RetryPolicy};

use super::host::{HostError, PluginHost, UNINSTALL_HOOK};
use super::registry::PluginRegistry;

/// Pause after the hook so the plugin process can release its binary.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(500);

/// Attempts to delete the binary before giving up.
pub const REMOVE_ATTEMPTS: u32 = 50;

/// Delay between deletion attempts.
pub const REMOVE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Removes installed plugins.
#[derive(Debug, Clone)]
pub struct Uninstaller {
    grace_period: Duration,
    remove_policy: RetryPolicy,
}

impl Default for Uninstaller {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            remove_policy: RetryPolicy::new(REMOVE_ATTEMPTS, Backoff::Fixed(REMOVE_RETRY_DELAY)),
        }
    }
}

impl Uninstaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn with_remove_policy(mut self, policy: RetryPolicy) -> Self {
        self.remove_policy = policy;
        self
    }

    /// Uninstall `name`.
    ///
    /// Returns `Ok(())` on a clean uninstall. `PluginExecute` and
    /// `PluginBinaryRemoveFailed` mean the plugin *was* deregistered.
    pub fn uninstall<H: PluginHost + ?Sized>(
        &self,
        registry: &mut PluginRegistry,
        host: &H,
        name: &str,
    ) -> Result<()> {
        let location = registry
            .get_plugin(name)
            .map(|p| p.location.clone())
            .ok_or_else(|| PlugError::PluginNotFound {
                plugin_name: name.to_string(),
            })?;

        let mut captured: Option<PlugError> = None;

        if location.exists() {
            match host.invoke(&location, UNINSTALL_HOOK) {
                Ok(()) => debug!(plugin = name, "Uninstall hook finished"),
                Err(e @ (HostError::ProcessExit { .. } | HostError::Path { .. })) => {
                    warn!(plugin = name, error = %e, "Uninstall hook failed, removing plugin anyway");
                    captured = Some(PlugError::PluginExecute { source: e });
                }
                Err(e) => return Err(e.into()),
            }

            if !self.grace_period.is_zero() {
                thread::sleep(self.grace_period);
            }
        } else {
            debug!(plugin = name, location = %location.display(), "Plugin binary already gone");
        }

        if let Err(e) = self.remove_binary(&location) {
            warn!(plugin = name, error = %e, "Could not remove plugin binary");
            if captured.is_none() {
                captured = Some(PlugError::PluginBinaryRemoveFailed { source: e });
            }
        }

        registry.remove_plugin(name);
        registry.write_plugin_config()?;
        info!(plugin = name, "Uninstalled plugin");

        match captured {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Delete `path`, retrying while it is busy. A missing file is success.
    fn remove_binary(&self, path: &Path) -> io::Result<()> {
        retry(self.remove_policy, |_: &io::Error| true, |attempt| {
            match fs::remove_file(path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => {
                    debug!(path = %path.display(), attempt, error = %e, "Plugin binary removal failed");
                    Err(e)
                }
            }
        })
    }
}
