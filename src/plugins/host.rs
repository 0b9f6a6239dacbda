//! Plugin host: runs plugin binaries as subprocesses
//!
//! A plugin is started as `<binary> <token>` and talks JSON-RPC 2.0 over its
//! standard streams. The plugin is the caller: it writes one request per
//! line to its stdout and reads the answer from its stdin. The host serves:
//!
//! | Method              | Params                    | Result |
//! |---------------------|---------------------------|--------|
//! | `SetPluginMetadata` | plugin metadata object    | `true` |
//! | `IsMinCliVersion`   | version string            | bool   |
//!
//! Any other method gets a `-32601` error and malformed params a `-32602`
//! error. Lines that are not JSON-RPC requests are plugin chatter and only
//! logged, so nothing a plugin prints can abort the host.
//!
//! # Tokens
//!
//! - [`SEND_METADATA`]: the plugin reports its metadata and exits.
//! - [`UNINSTALL_HOOK`]: the plugin cleans up after itself and exits.

use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::types::{Plugin, PluginCommand, PluginVersion};

/// Token asking a plugin to report its metadata.
pub const SEND_METADATA: &str = "SendMetadata";

/// Token asking a plugin to run its uninstall hook.
pub const UNINSTALL_HOOK: &str = "CLI-MESSAGE-UNINSTALL";

const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

/// Errors from running a plugin binary.
#[derive(Error, Debug)]
pub enum HostError {
    /// The plugin ran and exited unsuccessfully.
    #[error("Plugin {} exited with {}", .path.display(), .code.map(|c| format!("status {}", c)).unwrap_or_else(|| "a signal".into()))]
    ProcessExit { path: PathBuf, code: Option<i32> },

    /// The binary could not be started: missing, not executable, or not a
    /// program this system can run.
    #[error("Plugin binary {} could not be executed: {source}", .path.display())]
    Path {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The host could not set up the plugin's pipes or encode a reply.
    #[error("Plugin protocol error: {0}")]
    Protocol(String),

    /// Reading from or writing to the plugin's pipes failed.
    #[error("Plugin I/O error: {0}")]
    Io(#[from] io::Error),

    /// The hook watchdog killed the plugin.
    #[error("Plugin {} did not finish within {}s", .path.display(), .timeout.as_secs_f64())]
    Timeout { path: PathBuf, timeout: Duration },

    /// The plugin exited cleanly without reporting metadata.
    #[error("Plugin {} did not report its metadata", .path.display())]
    NoMetadata { path: PathBuf },
}

/// Runs plugin binaries.
#[cfg_attr(test, mockall::automock)]
pub trait PluginHost {
    /// Start the binary with [`SEND_METADATA`] and return what it reports.
    /// The returned plugin has no location yet.
    fn describe(&self, path: &Path) -> std::result::Result<Plugin, HostError>;

    /// Start the binary with `hook` and wait for it to exit.
    fn invoke(&self, path: &Path, hook: &str) -> std::result::Result<(), HostError>;
}

// ---- JSON-RPC 2.0 wire types ----

#[derive(Deserialize)]
struct RpcRequest {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcResponse {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Metadata object sent with `SetPluginMetadata`.
#[derive(Deserialize)]
struct PluginMetadata {
    name: String,
    #[serde(default)]
    version: PluginVersion,
    #[serde(default)]
    commands: Vec<PluginCommand>,
}

/// Params may be sent bare or wrapped in a one-element array.
fn unwrap_params(params: Value) -> Value {
    match params {
        Value::Array(mut items) if items.len() == 1 => items.remove(0),
        other => other,
    }
}

// ---- Host ----

/// [`PluginHost`] speaking JSON-RPC over the child's stdin/stdout.
#[derive(Debug, Clone)]
pub struct RpcPluginHost {
    /// Kill the child after this long. `None` waits forever.
    hook_timeout: Option<Duration>,
    /// Version answered to `IsMinCliVersion`.
    cli_version: semver::Version,
}

impl Default for RpcPluginHost {
    fn default() -> Self {
        Self::new(None)
    }
}

impl RpcPluginHost {
    pub fn new(hook_timeout: Option<Duration>) -> Self {
        let cli_version = semver::Version::parse(env!("CARGO_PKG_VERSION"))
            .unwrap_or_else(|_| semver::Version::new(0, 0, 0));
        Self {
            hook_timeout,
            cli_version,
        }
    }

    /// Override the version reported to plugins.
    pub fn with_cli_version(mut self, version: semver::Version) -> Self {
        self.cli_version = version;
        self
    }

    /// Run `path` with `token`, serving requests until the child exits.
    fn run(&self, path: &Path, token: &str) -> std::result::Result<Option<Plugin>, HostError> {
        debug!(plugin = %path.display(), token, "Starting plugin");

        let mut child = Command::new(path)
            .arg(token)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| HostError::Path {
                path: path.to_path_buf(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| HostError::Protocol("plugin stdin not available".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HostError::Protocol("plugin stdout not available".into()))?;

        let child = Arc::new(Mutex::new(child));
        let timed_out = Arc::new(AtomicBool::new(false));
        let watchdog = self
            .hook_timeout
            .map(|timeout| spawn_watchdog(Arc::clone(&child), Arc::clone(&timed_out), timeout));

        let served = self.serve(stdout, stdin);
        if served.is_err() {
            kill(&child);
        }

        let status = wait(&child);
        if let Some((done, handle)) = watchdog {
            let _ = done.send(());
            let _ = handle.join();
        }

        if timed_out.load(Ordering::SeqCst) {
            let timeout = self.hook_timeout.unwrap_or_default();
            warn!(plugin = %path.display(), timeout_secs = timeout.as_secs(), "Plugin killed by watchdog");
            return Err(HostError::Timeout {
                path: path.to_path_buf(),
                timeout,
            });
        }

        let metadata = served?;
        let status = status?;
        if !status.success() {
            return Err(HostError::ProcessExit {
                path: path.to_path_buf(),
                code: status.code(),
            });
        }

        debug!(plugin = %path.display(), token, "Plugin exited");
        Ok(metadata)
    }

    /// Answer requests read from `stdout` on `stdin` until EOF.
    fn serve(
        &self,
        stdout: impl io::Read,
        mut stdin: impl Write,
    ) -> std::result::Result<Option<Plugin>, HostError> {
        let mut metadata = None;

        for line in BufReader::new(stdout).split(b'\n') {
            let line = line?;
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let request: RpcRequest = match serde_json::from_str(line) {
                Ok(request) => request,
                Err(_) => {
                    debug!(output = line, "Plugin output");
                    continue;
                }
            };

            let (response, reported) = self.handle(request);
            if reported.is_some() {
                metadata = reported;
            }

            if let Some(response) = response {
                let mut out = serde_json::to_string(&response)
                    .map_err(|e| HostError::Protocol(e.to_string()))?;
                out.push('\n');
                match stdin.write_all(out.as_bytes()).and_then(|_| stdin.flush()) {
                    Ok(()) => {}
                    // The plugin may exit without reading its last answer.
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                        debug!("Plugin closed stdin before reading the response");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        Ok(metadata)
    }

    /// Dispatch one request. Notifications (no id) get no response.
    fn handle(&self, request: RpcRequest) -> (Option<RpcResponse>, Option<Plugin>) {
        debug!(method = %request.method, "Plugin request");
        let id = request.id;
        let params = unwrap_params(request.params);

        let (response, metadata) = match request.method.as_str() {
            "SetPluginMetadata" => match serde_json::from_value::<PluginMetadata>(params) {
                Ok(meta) => {
                    let plugin = Plugin {
                        name: meta.name,
                        version: meta.version,
                        location: PathBuf::new(),
                        commands: meta.commands,
                    };
                    (RpcResponse::ok(Value::Null, Value::Bool(true)), Some(plugin))
                }
                Err(e) => {
                    warn!(error = %e, "Plugin sent invalid metadata");
                    (
                        RpcResponse::err(
                            Value::Null,
                            INVALID_PARAMS,
                            format!("invalid plugin metadata: {}", e),
                        ),
                        None,
                    )
                }
            },
            "IsMinCliVersion" => match params.as_str() {
                Some(required) => {
                    let ok = semver::Version::parse(required)
                        .map(|required| self.cli_version >= required)
                        .unwrap_or(false);
                    (RpcResponse::ok(Value::Null, Value::Bool(ok)), None)
                }
                None => (
                    RpcResponse::err(Value::Null, INVALID_PARAMS, "expected a version string"),
                    None,
                ),
            },
            other => (
                RpcResponse::err(
                    Value::Null,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {}", other),
                ),
                None,
            ),
        };

        let response = id.map(|id| RpcResponse { id, ..response });
        (response, metadata)
    }
}

impl PluginHost for RpcPluginHost {
    fn describe(&self, path: &Path) -> std::result::Result<Plugin, HostError> {
        self.run(path, SEND_METADATA)?
            .ok_or_else(|| HostError::NoMetadata {
                path: path.to_path_buf(),
            })
    }

    fn invoke(&self, path: &Path, hook: &str) -> std::result::Result<(), HostError> {
        self.run(path, hook).map(|_| ())
    }
}

fn spawn_watchdog(
    child: Arc<Mutex<Child>>,
    timed_out: Arc<AtomicBool>,
    timeout: Duration,
) -> (mpsc::Sender<()>, thread::JoinHandle<()>) {
    let (done, rx) = mpsc::channel::<()>();
    let handle = thread::spawn(move || {
        if let Err(RecvTimeoutError::Timeout) = rx.recv_timeout(timeout) {
            timed_out.store(true, Ordering::SeqCst);
            kill(&child);
        }
    });
    (done, handle)
}

fn kill(child: &Mutex<Child>) {
    if let Ok(mut child) = child.lock() {
        if let Err(e) = child.kill() {
            debug!(error = %e, "Failed to kill plugin");
        }
    }
}

/// Reap the child without holding the lock across a blocking wait, so the
/// watchdog can still kill it.
fn wait(child: &Mutex<Child>) -> io::Result<ExitStatus> {
    loop {
        {
            let mut child = child
                .lock()
                .map_err(|_| io::Error::new(io::ErrorKind::Other, "plugin handle poisoned"))?;
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
        }
        thread::sleep(Duration::from_millis(10));
    }
}
