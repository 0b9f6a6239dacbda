//! Synchronous HTTP plumbing for plugin repositories
//!
//! Requests go through a stack of [`Connection`] layers:
//!
//! - [`HttpConnection`]: sends the request with `reqwest::blocking` and turns
//!   non-2xx answers into [`PlugError::RawHttpStatus`]
//! - [`RetryConnection`]: re-sends idempotent requests that failed with a
//!   transient server status
//! - [`RequestLogger`]: traces every request and its outcome
//!
//! Layers wrap each other, so the stack is assembled outside-in:
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use plugctl::http::{HttpConnection, RequestLogger, RetryConnection};
//!
//! let base = HttpConnection::new(Duration::from_secs(5), false).unwrap();
//! let connection = RequestLogger::new(RetryConnection::new(base, 2));
//! ```

mod retry;

pub use retry::{is_transient_status, RetryConnection};

use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use tracing::{debug, trace};

use crate::error::{PlugError, Result};

const USER_AGENT: &str = concat!("plugctl/", env!("CARGO_PKG_VERSION"));

/// HTTP method of a [`Request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Put,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Put => reqwest::Method::PUT,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A fully buffered request. Cloning it replays the same body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn get(url: &str) -> Self {
        Self {
            method: Method::Get,
            url: url.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: &str, body: Vec<u8>) -> Self {
        Self {
            method: Method::Post,
            url: url.to_string(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// A fully buffered 2xx response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    /// Decode the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// One layer of the request stack.
#[cfg_attr(test, mockall::automock)]
pub trait Connection {
    /// Send `request` and return the buffered response.
    ///
    /// Non-2xx statuses are errors ([`PlugError::RawHttpStatus`]).
    fn make(&self, request: &Request) -> Result<Response>;
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn make(&self, request: &Request) -> Result<Response> {
        (**self).make(request)
    }
}

/// Base layer backed by a `reqwest` blocking client.
///
/// Only connection establishment is bounded by a timeout; a transfer that
/// stalls after connecting is not cut off.
#[derive(Debug, Clone)]
pub struct HttpConnection {
    client: Client,
}

impl HttpConnection {
    /// Build the client with the given connect timeout.
    pub fn new(dial_timeout: Duration, skip_ssl_validation: bool) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(dial_timeout)
            .timeout(None::<Duration>)
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(skip_ssl_validation)
            .build()?;
        Ok(Self { client })
    }
}

impl Connection for HttpConnection {
    fn make(&self, request: &Request) -> Result<Response> {
        let mut builder = self
            .client
            .request(request.method.into(), request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send()?;
        let status = response.status();
        let body = response.bytes()?.to_vec();

        if !status.is_success() {
            return Err(PlugError::RawHttpStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(Response {
            status: status.as_u16(),
            body,
        })
    }
}

/// Layer that traces requests, outcomes and timings.
#[derive(Debug, Clone)]
pub struct RequestLogger<C> {
    inner: C,
}

impl<C: Connection> RequestLogger<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<C: Connection> Connection for RequestLogger<C> {
    fn make(&self, request: &Request) -> Result<Response> {
        debug!(method = request.method.as_str(), url = %request.url, "HTTP request");
        let started = Instant::now();
        let result = self.inner.make(request);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(response) => {
                debug!(status = response.status, bytes = response.body.len(), elapsed_ms, "HTTP response");
                trace!(body = %String::from_utf8_lossy(&response.body), "HTTP response body");
            }
            Err(e) => debug!(error = %e, elapsed_ms, "HTTP request failed"),
        }
        result
    }
}
