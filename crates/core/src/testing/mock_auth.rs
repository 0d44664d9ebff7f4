//! Mock auth provider for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::session::{AuthError, AuthProvider, SessionContext, TokenData, TokenPair};

/// Mock implementation of [`AuthProvider`].
///
/// Refreshes succeed with `"refreshed-token"` unless told otherwise.
pub struct MockAuthProvider {
    refresh_result: Mutex<Result<String, AuthError>>,
    refresh_count: AtomicUsize,
    log_out_count: AtomicUsize,
}

impl Default for MockAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAuthProvider {
    pub fn new() -> Self {
        Self {
            refresh_result: Mutex::new(Ok("refreshed-token".to_string())),
            refresh_count: AtomicUsize::new(0),
            log_out_count: AtomicUsize::new(0),
        }
    }

    /// New access token (or error) returned by every following refresh.
    pub fn set_refresh_result(&self, result: Result<String, AuthError>) {
        *self
            .refresh_result
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = result;
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_count.load(Ordering::SeqCst)
    }

    pub fn log_out_count(&self) -> usize {
        self.log_out_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn refresh_token(&self, _current: &TokenData) -> Result<TokenPair, AuthError> {
        self.refresh_count.fetch_add(1, Ordering::SeqCst);
        let result = self
            .refresh_result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        result.map(|access_token| TokenPair {
            access_token,
            refresh_token: None,
        })
    }

    fn login_request_url(&self, host_key: &str) -> Result<String, AuthError> {
        Ok(format!("https://login.example.com/authorize?sc={}", host_key))
    }

    async fn log_out(&self, session: &SessionContext) {
        self.log_out_count.fetch_add(1, Ordering::SeqCst);
        session.clear().await;
    }
}
