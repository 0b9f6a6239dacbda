//! Retry layer for transient repository failures.

use tracing::warn;

use crate::error::{PlugError, Result};
use crate::utils::retry::{retry, RetryPolicy};

use super::{Connection, Method, Request, Response};

/// Server statuses worth sending the same request again for.
pub fn is_transient_status(status: u16) -> bool {
    matches!(status, 500 | 502 | 503 | 504)
}

/// Re-sends a request up to `max_retries` extra times when it failed with
/// a transient server status.
///
/// `POST` requests are never retried. Every other failure, including
/// transport errors and non-transient statuses, is returned at once.
#[derive(Debug, Clone)]
pub struct RetryConnection<C> {
    inner: C,
    max_retries: u32,
}

impl<C: Connection> RetryConnection<C> {
    pub fn new(inner: C, max_retries: u32) -> Self {
        Self { inner, max_retries }
    }
}

impl<C: Connection> Connection for RetryConnection<C> {
    fn make(&self, request: &Request) -> Result<Response> {
        let retryable_method = request.method != Method::Post;

        retry(
            RetryPolicy::immediate(self.max_retries),
            |e: &PlugError| {
                retryable_method
                    && matches!(e, PlugError::RawHttpStatus { status, .. } if is_transient_status(*status))
            },
            |attempt| {
                if attempt > 1 {
                    warn!(url = %request.url, attempt, "Retrying request after server error");
                }
                // Each attempt gets its own copy so the body is replayed intact.
                let replay = request.clone();
                self.inner.make(&replay)
            },
        )
    }
}
