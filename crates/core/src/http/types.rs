//! Request and response types shared by the pipeline and its transports.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
pub const CONTENT_TYPE_JSON: &str = "application/json; charset=UTF-8";
pub const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// A fully built request, ready for a transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Correlates log lines of all attempts of one logical request.
    pub id: Uuid,
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Serialized JSON body.
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(id: Uuid, method: HttpMethod, url: impl Into<String>, body: Option<String>) -> Self {
        Self {
            id,
            method,
            url: url.into(),
            headers: Vec::new(),
            body,
        }
    }

    /// Set a header, replacing any existing value (names are case-insensitive).
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name.to_string(), value)),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What a transport saw on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
    /// The transport aborted the exchange.
    pub aborted: bool,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            aborted: false,
        }
    }

    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn aborted() -> Self {
        Self {
            status: 0,
            body: String::new(),
            aborted: true,
        }
    }
}

/// Transport-level failures (no HTTP status was received).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Transport error: {0}")]
    Other(String),
}

/// Application-level status of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Success,
    Error,
    AuthenticationFailed,
}

/// Normalized result of one HTTP exchange.
///
/// Only the response body may change after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestResult {
    status_code: u16,
    is_successful: bool,
    is_cancelled: bool,
    response_body: Option<Value>,
    custom_status: RequestStatus,
    request_url: String,
    execution_time_seconds: f64,
    created_at: DateTime<Utc>,
}

impl RequestResult {
    /// Wrap a transport response. The body is parsed as JSON, falling back to raw text.
    pub fn from_response(
        request_url: &str,
        response: RawResponse,
        requested_at: DateTime<Utc>,
        responded_at: DateTime<Utc>,
    ) -> Self {
        let body = parse_body(request_url, &response.body);
        Self::build(
            request_url,
            response.status,
            body,
            response.aborted,
            requested_at,
            responded_at,
        )
    }

    /// A result for a request that never got an HTTP status (status code 0).
    pub fn transport_failure(
        request_url: &str,
        error: &TransportError,
        requested_at: DateTime<Utc>,
        responded_at: DateTime<Utc>,
    ) -> Self {
        Self::build(
            request_url,
            0,
            Some(Value::String(error.to_string())),
            false,
            requested_at,
            responded_at,
        )
    }

    /// A result for a request that could not be built.
    pub fn client_failure(request_url: &str, message: impl Into<String>) -> Self {
        let now = Utc::now();
        Self::build(
            request_url,
            0,
            Some(Value::String(message.into())),
            false,
            now,
            now,
        )
    }

    /// A result for a request that could not be sent because no user is signed in.
    pub fn not_authenticated(request_url: &str) -> Self {
        let now = Utc::now();
        Self::build(request_url, 401, None, false, now, now).into_authentication_failed()
    }

    /// A synthetic successful result carrying `body`, used for cached data.
    pub fn cached(request_url: &str, body: Value) -> Self {
        let now = Utc::now();
        Self::build(request_url, 200, Some(body), false, now, now)
    }

    fn build(
        request_url: &str,
        status_code: u16,
        response_body: Option<Value>,
        is_cancelled: bool,
        requested_at: DateTime<Utc>,
        responded_at: DateTime<Utc>,
    ) -> Self {
        let is_successful = (200..300).contains(&status_code) && has_content(&response_body);
        let elapsed_ms = (responded_at - requested_at).num_milliseconds();

        Self {
            status_code,
            is_successful,
            is_cancelled,
            response_body,
            custom_status: if is_successful {
                RequestStatus::Success
            } else {
                RequestStatus::Error
            },
            request_url: request_url.to_string(),
            execution_time_seconds: elapsed_ms as f64 / 1000.0,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn into_authentication_failed(mut self) -> Self {
        self.custom_status = RequestStatus::AuthenticationFailed;
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn is_successful(&self) -> bool {
        self.is_successful
    }

    pub fn is_cancelled(&self) -> bool {
        self.is_cancelled
    }

    pub fn custom_status(&self) -> RequestStatus {
        self.custom_status
    }

    pub fn is_authentication_failed(&self) -> bool {
        self.custom_status == RequestStatus::AuthenticationFailed
    }

    pub fn request_url(&self) -> &str {
        &self.request_url
    }

    pub fn execution_time_seconds(&self) -> f64 {
        self.execution_time_seconds
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn body(&self) -> Option<&Value> {
        self.response_body.as_ref()
    }

    /// Replace the response body (post-processing such as sorting or filtering).
    pub fn set_body(&mut self, body: Value) {
        self.response_body = Some(body);
    }

    /// Deserialize the response body into `T`.
    pub fn parse_body<T: DeserializeOwned>(&self) -> Result<T, BodyError> {
        let body = self.response_body.as_ref().ok_or(BodyError::Missing)?;
        serde_json::from_value(body.clone()).map_err(|e| BodyError::Invalid(e.to_string()))
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BodyError {
    #[error("Response has no body")]
    Missing,

    #[error("Unexpected response body: {0}")]
    Invalid(String),
}

/// Result of sending a request through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Completed(RequestResult),
    /// The request was superseded or explicitly cancelled. Nobody should observe it.
    Cancelled,
}

impl RequestOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RequestOutcome::Cancelled)
    }

    pub fn result(&self) -> Option<&RequestResult> {
        match self {
            RequestOutcome::Completed(result) => Some(result),
            RequestOutcome::Cancelled => None,
        }
    }

    pub fn into_result(self) -> Option<RequestResult> {
        match self {
            RequestOutcome::Completed(result) => Some(result),
            RequestOutcome::Cancelled => None,
        }
    }
}

fn parse_body(request_url: &str, text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Null) => None,
        Ok(value) => Some(value),
        Err(e) => {
            // Some server errors come back as plain text or HTML.
            warn!(url = %request_url, error = %e, "Response body is not JSON");
            Some(Value::String(text.to_string()))
        }
    }
}

/// A body counts as present unless it is missing or JSON `null`.
fn has_content(body: &Option<Value>) -> bool {
    matches!(body, Some(value) if !value.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn result(status: u16, body: &str) -> RequestResult {
        let requested = Utc::now();
        let responded = requested + Duration::milliseconds(1500);
        RequestResult::from_response("https://h/v1/x", RawResponse::new(status, body), requested, responded)
    }

    #[test]
    fn test_success_requires_body() {
        let ok = result(200, r#"{"a":1}"#);
        assert!(ok.is_successful());
        assert_eq!(ok.custom_status(), RequestStatus::Success);

        let empty = result(200, "");
        assert!(!empty.is_successful());
        assert_eq!(empty.custom_status(), RequestStatus::Error);
        assert!(empty.body().is_none());
    }

    #[test]
    fn test_any_present_body_counts_as_content() {
        for body in ["false", "0", r#""""#, "[]", "{}"] {
            assert!(result(200, body).is_successful(), "body {}", body);
        }
        assert!(!result(200, "null").is_successful());
        assert!(!result(204, "  ").is_successful());
    }

    #[test]
    fn test_non_2xx_is_error() {
        let failed = result(404, r#"{"message":"missing"}"#);
        assert!(!failed.is_successful());
        assert_eq!(failed.status_code(), 404);
        assert_eq!(failed.body(), Some(&json!({"message": "missing"})));
    }

    #[test]
    fn test_non_json_body_falls_back_to_text() {
        let failed = result(500, "<html>Server Error</html>");
        assert_eq!(
            failed.body(),
            Some(&Value::String("<html>Server Error</html>".to_string()))
        );
    }

    #[test]
    fn test_execution_time_in_seconds() {
        let r = result(200, "{}");
        assert!((r.execution_time_seconds() - 1.5).abs() < f64::EPSILON);
        assert_eq!(r.request_url(), "https://h/v1/x");
    }

    #[test]
    fn test_aborted_response_is_cancelled() {
        let now = Utc::now();
        let r = RequestResult::from_response("u", RawResponse::aborted(), now, now);
        assert!(r.is_cancelled());
        assert!(!r.is_successful());
    }

    #[test]
    fn test_set_and_parse_body() {
        #[derive(Deserialize)]
        struct Payload {
            value: u32,
        }

        let mut r = result(200, r#"{"value":1}"#);
        r.set_body(json!({"value": 7}));
        assert_eq!(r.parse_body::<Payload>().unwrap().value, 7);

        let empty = result(204, "");
        assert_eq!(empty.parse_body::<Payload>().err(), Some(BodyError::Missing));
    }

    #[test]
    fn test_not_authenticated_marks_status() {
        let r = RequestResult::not_authenticated("/user/cabinets");
        assert_eq!(r.status_code(), 401);
        assert!(r.is_authentication_failed());
    }

    #[test]
    fn test_request_headers_replace_case_insensitive() {
        let mut request = HttpRequest::new(Uuid::new_v4(), HttpMethod::Get, "u", None);
        request.set_header("Authorization", "Bearer a");
        request.set_header("authorization", "Bearer b");

        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.header("AUTHORIZATION"), Some("Bearer b"));
    }
}
