//! Retry decisions for failed responses.

use crate::config::HttpConfig;

/// Maximum number of resends after a 5xx response.
pub const MAX_RETRY_COUNT: u32 = 3;

/// URL fragment identifying the client logging endpoint.
pub const LOGGING_URL: &str = "clientLogging";

/// Per-request retry bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    pub retry_count: u32,
    pub refresh_attempted: bool,
}

/// What to do with a failed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Refresh the access token, then resend with the new token.
    RefreshAndResend,
    /// Resend as is.
    Resend,
    /// Return the failure to the caller.
    Fail,
}

/// Stateless mapping from a response status to a [`RetryDecision`].
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    retry_on_error_endpoints: Vec<String>,
}

impl RetryPolicy {
    pub fn new(retry_on_error_endpoints: Vec<String>) -> Self {
        Self {
            retry_on_error_endpoints,
        }
    }

    pub fn from_config(config: &HttpConfig) -> Self {
        Self::new(config.retry_on_error_endpoints.clone())
    }

    pub fn decide(&self, status: u16, url: &str, state: &RetryState) -> RetryDecision {
        match status {
            401 if is_logging_endpoint(url) || state.refresh_attempted => RetryDecision::Fail,
            401 => RetryDecision::RefreshAndResend,
            s if is_retryable_status(s)
                && self.is_retry_allowed(url)
                && state.retry_count < MAX_RETRY_COUNT =>
            {
                RetryDecision::Resend
            }
            _ => RetryDecision::Fail,
        }
    }

    /// Substring match of `url` against the configured allow-list.
    pub fn is_retry_allowed(&self, url: &str) -> bool {
        self.retry_on_error_endpoints
            .iter()
            .any(|endpoint| url.contains(endpoint.as_str()))
    }
}

pub fn is_logging_endpoint(url: &str) -> bool {
    url.contains(LOGGING_URL)
}

/// 500, 501, 502, 503, 504 and 505.
pub fn is_retryable_status(status: u16) -> bool {
    (500..=505).contains(&status)
}
