//! Authenticated request pipeline with token refresh and bounded retry.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::session::{AuthError, AuthProvider, SessionContext};

use super::retry::{RetryDecision, RetryPolicy, RetryState};
use super::transport::HttpTransport;
use super::types::{
    HttpMethod, HttpRequest, RequestOutcome, RequestResult, AUTHORIZATION_HEADER, BEARER_PREFIX,
    CONTENT_TYPE_HEADER, CONTENT_TYPE_JSON,
};

/// Sends requests to the signed-in host.
///
/// Every attempt reads the access token from the [`SessionContext`] when it is
/// built. A 401 triggers at most one token refresh per request, and 5xx
/// responses from allow-listed endpoints are resent up to
/// [`MAX_RETRY_COUNT`](super::MAX_RETRY_COUNT) times.
pub struct HttpPipeline {
    transport: Arc<dyn HttpTransport>,
    auth: Arc<dyn AuthProvider>,
    session: Arc<SessionContext>,
    policy: RetryPolicy,
    /// Serializes refreshes so concurrent 401s refresh the token once.
    refresh_lock: Mutex<()>,
}

impl HttpPipeline {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        auth: Arc<dyn AuthProvider>,
        session: Arc<SessionContext>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            auth,
            session,
            policy,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn auth(&self) -> &Arc<dyn AuthProvider> {
        &self.auth
    }

    pub async fn get(&self, relative_url: &str, cancel: Option<&CancellationToken>) -> RequestOutcome {
        self.send(HttpMethod::Get, relative_url, None, cancel).await
    }

    pub async fn post<B>(
        &self,
        relative_url: &str,
        body: &B,
        cancel: Option<&CancellationToken>,
    ) -> RequestOutcome
    where
        B: Serialize + ?Sized,
    {
        match serde_json::to_value(body) {
            Ok(value) => self.send(HttpMethod::Post, relative_url, Some(value), cancel).await,
            Err(e) => {
                warn!(url = relative_url, error = %e, "Failed to serialize request body");
                RequestOutcome::Completed(RequestResult::client_failure(relative_url, e.to_string()))
            }
        }
    }

    /// Send a request and apply the retry policy until it settles.
    pub async fn send(
        &self,
        method: HttpMethod,
        relative_url: &str,
        body: Option<Value>,
        cancel: Option<&CancellationToken>,
    ) -> RequestOutcome {
        let base_url = match self.session.api_base_url().await {
            Ok(base) => base,
            Err(e) => {
                warn!(url = relative_url, error = %e, "Cannot send request");
                return RequestOutcome::Completed(RequestResult::not_authenticated(relative_url));
            }
        };
        let url = format!("{}{}", base_url, relative_url);
        let body = body.filter(|b| !b.is_null()).map(|b| b.to_string());
        let id = Uuid::new_v4();
        let mut state = RetryState::default();

        loop {
            if is_cancelled(cancel) {
                debug!(request_id = %id, url = %url, "Request cancelled before sending");
                return RequestOutcome::Cancelled;
            }

            let access_token = self.session.access_token().await.unwrap_or_default();
            let mut request = HttpRequest::new(id, method, url.clone(), body.clone());
            request.set_header(AUTHORIZATION_HEADER, format!("{}{}", BEARER_PREFIX, access_token));
            if method == HttpMethod::Post {
                request.set_header(CONTENT_TYPE_HEADER, CONTENT_TYPE_JSON);
            }

            let result = match self.execute(&request, cancel).await {
                RequestOutcome::Completed(result) => result,
                RequestOutcome::Cancelled => return RequestOutcome::Cancelled,
            };

            let status = result.status_code();
            if (200..300).contains(&status) {
                return RequestOutcome::Completed(result);
            }

            match self.policy.decide(status, &url, &state) {
                RetryDecision::RefreshAndResend => {
                    state.refresh_attempted = true;
                    match self.refresh_session(&access_token).await {
                        Ok(()) => {
                            debug!(request_id = %id, url = %url, "Resending with refreshed token");
                        }
                        Err(e) => {
                            warn!(request_id = %id, url = %url, error = %e, "Token refresh failed");
                            return RequestOutcome::Completed(result.into_authentication_failed());
                        }
                    }
                }
                RetryDecision::Resend => {
                    state.retry_count += 1;
                    warn!(
                        request_id = %id,
                        url = %url,
                        status,
                        attempt = state.retry_count,
                        "Server error, resending"
                    );
                }
                RetryDecision::Fail => {
                    if status == 401 && state.refresh_attempted {
                        return RequestOutcome::Completed(result.into_authentication_failed());
                    }
                    debug!(request_id = %id, url = %url, status, "Request failed");
                    return RequestOutcome::Completed(result);
                }
            }
        }
    }

    /// One transport call, raced against cancellation.
    async fn execute(&self, request: &HttpRequest, cancel: Option<&CancellationToken>) -> RequestOutcome {
        debug!(
            request_id = %request.id,
            method = request.method.as_str(),
            url = %request.url,
            "Sending request"
        );

        let requested_at = Utc::now();
        let response = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!(request_id = %request.id, "Request aborted");
                        return RequestOutcome::Cancelled;
                    }
                    response = self.transport.execute(request) => response,
                }
            }
            None => self.transport.execute(request).await,
        };
        let responded_at = Utc::now();

        // A value that arrives after cancellation is suppressed.
        if is_cancelled(cancel) {
            debug!(request_id = %request.id, "Discarding response of cancelled request");
            return RequestOutcome::Cancelled;
        }

        let result = match response {
            Ok(raw) => RequestResult::from_response(&request.url, raw, requested_at, responded_at),
            Err(e) => {
                warn!(request_id = %request.id, url = %request.url, error = %e, "Transport error");
                RequestResult::transport_failure(&request.url, &e, requested_at, responded_at)
            }
        };

        if result.is_cancelled() {
            return RequestOutcome::Cancelled;
        }

        debug!(
            request_id = %request.id,
            status = result.status_code(),
            seconds = result.execution_time_seconds(),
            "Received response"
        );
        RequestOutcome::Completed(result)
    }

    /// Refresh the access token unless another request already replaced `stale_token`.
    async fn refresh_session(&self, stale_token: &str) -> Result<(), AuthError> {
        let _guard = self.refresh_lock.lock().await;

        let current = self
            .session
            .token_data()
            .await
            .ok_or(AuthError::MissingRefreshToken)?;
        if current.access_token != stale_token {
            debug!("Access token already refreshed");
            return Ok(());
        }

        let pair = self.auth.refresh_token(&current).await?;
        if !self.session.replace_tokens(pair).await {
            return Err(AuthError::MissingRefreshToken);
        }
        info!(host = %current.host_key, "Access token refreshed");
        Ok(())
    }
}

fn is_cancelled(cancel: Option<&CancellationToken>) -> bool {
    cancel.is_some_and(|t| t.is_cancelled())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, HttpConfig};
    use crate::http::{RawResponse, RequestStatus, TransportError};
    use crate::session::TokenData;
    use crate::testing::{MockAuthProvider, MockTransport};
    use serde_json::json;

    const PREDICT: &str = "/filingLocations/C1/predictiveSearch";

    struct Harness {
        transport: Arc<MockTransport>,
        auth: Arc<MockAuthProvider>,
        session: Arc<SessionContext>,
        pipeline: HttpPipeline,
    }

    async fn harness() -> Harness {
        let transport = Arc::new(MockTransport::new());
        let auth = Arc::new(MockAuthProvider::new());
        let session = Arc::new(SessionContext::new(&ApiConfig::default()));
        session
            .sign_in(TokenData {
                access_token: "T0".to_string(),
                refresh_token: Some("R0".to_string()),
                host_key: "prod.name.com".to_string(),
            })
            .await;
        let pipeline = HttpPipeline::new(
            transport.clone(),
            auth.clone(),
            session.clone(),
            RetryPolicy::from_config(&HttpConfig::default()),
        );
        Harness {
            transport,
            auth,
            session,
            pipeline,
        }
    }

    #[tokio::test]
    async fn test_attaches_headers_and_body() {
        let h = harness().await;
        h.transport
            .respond(PREDICT, RawResponse::json(200, &json!({"filingLocations": []})));

        let outcome = h.pipeline.post(PREDICT, &json!({"subject": "s"}), None).await;
        assert!(outcome.result().unwrap().is_successful());

        let requests = h.transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].url,
            "https://product-us.domain.com/v1/filingLocations/C1/predictiveSearch"
        );
        assert_eq!(requests[0].header("Authorization"), Some("Bearer T0"));
        assert_eq!(requests[0].header("Content-Type"), Some(CONTENT_TYPE_JSON));
        assert_eq!(requests[0].body.as_deref(), Some(r#"{"subject":"s"}"#));
    }

    #[tokio::test]
    async fn test_get_has_no_body() {
        let h = harness().await;
        h.transport.respond("/user/cabinets", RawResponse::json(200, &json!([])));

        h.pipeline.get("/user/cabinets", None).await;

        let requests = h.transport.requests();
        assert!(requests[0].body.is_none());
        assert!(requests[0].header("Content-Type").is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_retried_three_times() {
        let h = harness().await;
        h.transport.respond(PREDICT, RawResponse::new(503, ""));

        let outcome = h.pipeline.post(PREDICT, &json!({}), None).await;

        let result = outcome.into_result().unwrap();
        assert_eq!(result.status_code(), 503);
        assert_eq!(result.custom_status(), RequestStatus::Error);
        assert_eq!(h.transport.request_count(PREDICT), 4);
    }

    #[tokio::test]
    async fn test_server_error_recovers() {
        let h = harness().await;
        h.transport.respond_once(PREDICT, RawResponse::new(500, ""));
        h.transport.respond_once(PREDICT, RawResponse::new(502, ""));
        h.transport.respond(PREDICT, RawResponse::json(200, &json!({"ok": true})));

        let outcome = h.pipeline.post(PREDICT, &json!({}), None).await;

        assert!(outcome.result().unwrap().is_successful());
        assert_eq!(h.transport.request_count(PREDICT), 3);
    }

    #[tokio::test]
    async fn test_server_error_on_unlisted_endpoint_not_retried() {
        let h = harness().await;
        h.transport.respond("/filingItems", RawResponse::new(500, ""));

        h.pipeline.post("/filingItems", &json!({}), None).await;
        assert_eq!(h.transport.request_count("/filingItems"), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_refreshes_and_resends_with_new_token() {
        let h = harness().await;
        h.auth.set_refresh_result(Ok("T1".to_string()));
        h.transport.respond_once(PREDICT, RawResponse::new(401, ""));
        h.transport.respond(PREDICT, RawResponse::json(200, &json!({"ok": true})));

        let outcome = h.pipeline.post(PREDICT, &json!({}), None).await;

        assert!(outcome.result().unwrap().is_successful());
        let requests = h.transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].header("Authorization"), Some("Bearer T0"));
        assert_eq!(requests[1].header("Authorization"), Some("Bearer T1"));
        assert_eq!(h.session.access_token().await.as_deref(), Some("T1"));
        assert_eq!(h.auth.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_propagates_single_failure() {
        let h = harness().await;
        h.auth.set_refresh_result(Err(AuthError::Rejected(400)));
        h.transport.respond(PREDICT, RawResponse::new(401, ""));

        let outcome = h.pipeline.post(PREDICT, &json!({}), None).await;

        let result = outcome.into_result().unwrap();
        assert_eq!(result.status_code(), 401);
        assert!(result.is_authentication_failed());
        assert_eq!(h.transport.request_count(PREDICT), 1);
        assert_eq!(h.auth.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_repeated_unauthorized_refreshes_only_once() {
        let h = harness().await;
        h.auth.set_refresh_result(Ok("T1".to_string()));
        h.transport.respond(PREDICT, RawResponse::new(401, ""));

        let outcome = h.pipeline.post(PREDICT, &json!({}), None).await;

        assert!(outcome.into_result().unwrap().is_authentication_failed());
        assert_eq!(h.transport.request_count(PREDICT), 2);
        assert_eq!(h.auth.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_logging_endpoint_not_refreshed() {
        let h = harness().await;
        h.transport.respond("/clientLogging", RawResponse::new(401, ""));

        let outcome = h.pipeline.post("/clientLogging", &json!({}), None).await;

        let result = outcome.into_result().unwrap();
        assert_eq!(result.status_code(), 401);
        assert!(!result.is_authentication_failed());
        assert_eq!(h.auth.refresh_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_error_becomes_status_zero() {
        let h = harness().await;
        h.transport
            .fail(PREDICT, TransportError::ConnectionFailed("refused".to_string()));

        let outcome = h.pipeline.post(PREDICT, &json!({}), None).await;

        let result = outcome.into_result().unwrap();
        assert_eq!(result.status_code(), 0);
        assert!(!result.is_successful());
        assert_eq!(h.transport.request_count(PREDICT), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let h = harness().await;
        let token = CancellationToken::new();
        token.cancel();

        let outcome = h.pipeline.get("/user/cabinets", Some(&token)).await;

        assert!(outcome.is_cancelled());
        assert!(h.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_while_in_flight() {
        let h = harness().await;
        let gate = h.transport.hold(PREDICT);
        let token = CancellationToken::new();

        let body = json!({});
        let (outcome, _) = tokio::join!(h.pipeline.post(PREDICT, &body, Some(&token)), async {
            h.transport.wait_for_requests(1).await;
            token.cancel();
        });

        assert!(outcome.is_cancelled());
        drop(gate);
    }

    #[tokio::test]
    async fn test_aborted_response_is_cancelled() {
        let h = harness().await;
        h.transport.respond(PREDICT, RawResponse::aborted());

        let outcome = h.pipeline.post(PREDICT, &json!({}), None).await;
        assert!(outcome.is_cancelled());
    }

    #[tokio::test]
    async fn test_signed_out_session_fails_without_sending() {
        let h = harness().await;
        h.session.clear().await;

        let outcome = h.pipeline.get("/user/cabinets", None).await;

        assert!(outcome.into_result().unwrap().is_authentication_failed());
        assert!(h.transport.requests().is_empty());
    }
}
