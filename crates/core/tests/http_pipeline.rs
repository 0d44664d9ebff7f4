//! Pipeline integration tests against a local HTTP server.
//!
//! These drive the reqwest transport through the pipeline:
//! - Bearer token on every request
//! - Refresh and resend after a 401
//! - Bounded resend of allow-listed endpoints after a 5xx
//! - Transport failures and cancellation

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mailfiler_core::config::{ApiConfig, HostData, HttpConfig, LoggingConfig};
use mailfiler_core::testing::{fixtures, MockAuthProvider};
use mailfiler_core::{
    ActivityLog, ClientInfo, HttpPipeline, PredictionCoordinator, RequestOutcome, RequestStatus, ReqwestTransport,
    RetryPolicy, SearchCoordinator, SessionContext, TokenData,
};

const HOST_KEY: &str = "local.test";

struct TestHarness {
    server: MockServer,
    auth: Arc<MockAuthProvider>,
    pipeline: Arc<HttpPipeline>,
}

impl TestHarness {
    async fn new() -> Self {
        let server = MockServer::start().await;
        let (auth, pipeline) = signed_in_pipeline(&server.address().to_string()).await;
        Self {
            server,
            auth,
            pipeline,
        }
    }

    async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }
}

/// A pipeline signed in to a host at `address` over plain HTTP.
async fn signed_in_pipeline(address: &str) -> (Arc<MockAuthProvider>, Arc<HttpPipeline>) {
    let api = ApiConfig {
        scheme: "http://".to_string(),
        hosts: vec![HostData::new(HOST_KEY, "Local", address)],
    };
    let session = Arc::new(SessionContext::new(&api));
    session
        .sign_in(TokenData {
            access_token: "T0".to_string(),
            refresh_token: Some("R0".to_string()),
            host_key: HOST_KEY.to_string(),
        })
        .await;

    let auth = Arc::new(MockAuthProvider::new());
    let transport = Arc::new(tokio_test::assert_ok!(ReqwestTransport::new(5)));
    let pipeline = Arc::new(HttpPipeline::new(
        transport,
        auth.clone(),
        session,
        RetryPolicy::from_config(&HttpConfig::default()),
    ));
    (auth, pipeline)
}

fn completed(outcome: RequestOutcome) -> mailfiler_core::RequestResult {
    outcome.into_result().expect("Request was cancelled")
}

#[tokio::test]
async fn test_get_sends_bearer_token() {
    let h = TestHarness::new().await;
    Mock::given(method("GET"))
        .and(path("/v1/user/cabinets"))
        .and(header("Authorization", "Bearer T0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"repositories": []})))
        .expect(1)
        .mount(&h.server)
        .await;

    let result = completed(h.pipeline.get("/user/cabinets", None).await);

    assert!(result.is_successful());
    assert_eq!(result.status_code(), 200);
    assert_eq!(result.body(), Some(&json!({"repositories": []})));
    assert!(result.request_url().ends_with("/v1/user/cabinets"));
}

#[tokio::test]
async fn test_unauthorized_refreshes_and_resends() {
    let h = TestHarness::new().await;
    Mock::given(method("GET"))
        .and(path("/v1/user/cabinets"))
        .and(header("Authorization", "Bearer T0"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/user/cabinets"))
        .and(header("Authorization", "Bearer refreshed-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"repositories": []})))
        .mount(&h.server)
        .await;

    let result = completed(h.pipeline.get("/user/cabinets", None).await);

    assert!(result.is_successful());
    assert_eq!(h.auth.refresh_count(), 1);
    assert_eq!(h.request_count().await, 2);
    assert_eq!(
        h.pipeline.session().access_token().await.as_deref(),
        Some("refreshed-token")
    );
}

#[tokio::test]
async fn test_concurrent_unauthorized_requests_refresh_once() {
    let h = TestHarness::new().await;
    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer T0"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer refreshed-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"repositories": []})))
        .mount(&h.server)
        .await;

    let requests = (0..3).map(|_| h.pipeline.get("/user/cabinets", None));
    let outcomes = futures::future::join_all(requests).await;

    for outcome in outcomes {
        assert!(completed(outcome).is_successful());
    }
    assert_eq!(h.auth.refresh_count(), 1);
}

#[tokio::test]
async fn test_unauthorized_after_refresh_fails_authentication() {
    let h = TestHarness::new().await;
    Mock::given(method("GET"))
        .and(path("/v1/user/cabinets"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;

    let result = completed(h.pipeline.get("/user/cabinets", None).await);

    assert!(!result.is_successful());
    assert!(result.is_authentication_failed());
    assert_eq!(result.custom_status(), RequestStatus::AuthenticationFailed);
    assert_eq!(h.auth.refresh_count(), 1);
    assert_eq!(h.request_count().await, 2);
}

#[tokio::test]
async fn test_server_error_resent_for_allowed_endpoint() {
    let h = TestHarness::new().await;
    Mock::given(method("GET"))
        .and(path("/v1/user/cabinets"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/user/cabinets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"repositories": []})))
        .mount(&h.server)
        .await;

    let result = completed(h.pipeline.get("/user/cabinets", None).await);

    assert!(result.is_successful());
    assert_eq!(h.request_count().await, 3);
}

#[tokio::test]
async fn test_server_error_resends_are_bounded() {
    let h = TestHarness::new().await;
    Mock::given(method("GET"))
        .and(path("/v1/user/cabinets"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.server)
        .await;

    let result = completed(h.pipeline.get("/user/cabinets", None).await);

    assert_eq!(result.status_code(), 500);
    // One send plus three resends
    assert_eq!(h.request_count().await, 4);
}

#[tokio::test]
async fn test_server_error_not_resent_for_other_endpoints() {
    let h = TestHarness::new().await;
    Mock::given(method("POST"))
        .and(path("/v1/clientLogging"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&h.server)
        .await;

    let result = completed(
        h.pipeline
            .post("/clientLogging", &json!([{"action": "test"}]), None)
            .await,
    );

    assert_eq!(result.status_code(), 502);
    assert_eq!(h.request_count().await, 1);
}

#[tokio::test]
async fn test_connection_failure_is_status_zero() {
    // Bind only to learn a free port, then release it.
    let address = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
        listener.local_addr().expect("No local address").to_string()
    };
    let (auth, pipeline) = signed_in_pipeline(&address).await;

    let result = completed(pipeline.get("/user/cabinets", None).await);

    assert_eq!(result.status_code(), 0);
    assert!(!result.is_successful());
    assert_eq!(auth.refresh_count(), 0);
}

#[tokio::test]
async fn test_cancelled_request_is_aborted() {
    let h = TestHarness::new().await;
    Mock::given(method("GET"))
        .and(path("/v1/user/cabinets"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&h.server)
        .await;

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let outcome = h.pipeline.get("/user/cabinets", Some(&token)).await;

    assert!(outcome.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_prediction_posts_digest_and_sorts_locations() {
    let h = TestHarness::new().await;
    let body = json!({
        "filingLocations": [
            {"location": {"envId": "low", "name": "Low", "type": "FOLDER"}, "relevance": 0.2, "documentExists": false},
            {"location": {"envId": "filed", "name": "Filed", "type": "FOLDER"}, "relevance": 0.1, "documentExists": true},
            {"location": {"envId": "high", "name": "High", "type": "FOLDER"}, "relevance": 0.9, "documentExists": false}
        ]
    });
    Mock::given(method("POST"))
        .and(path("/v1/filingLocations/C1/predictiveSearch"))
        .and(header("Content-Type", "application/json; charset=UTF-8"))
        .and(body_partial_json(json!({"subject": "Quarterly report"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&h.server)
        .await;

    let coordinator = PredictionCoordinator::new(h.pipeline.clone());
    let result = completed(
        coordinator
            .load_predictions("C1", &fixtures::digest("Quarterly report"))
            .await,
    );

    assert!(result.is_successful());
    let ids: Vec<&str> = result.body().expect("missing body")["filingLocations"]
        .as_array()
        .expect("filingLocations is not an array")
        .iter()
        .filter_map(|l| l["location"]["envId"].as_str())
        .collect();
    assert_eq!(ids, vec!["filed", "high", "low"]);
}

#[tokio::test]
async fn test_quick_search_encodes_query_and_applies_configuration() {
    let h = TestHarness::new().await;
    Mock::given(method("GET"))
        .and(path("/v1/filingLocations/C1/quickSearch"))
        .and(query_param("query", "q1 & reports"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "filingLocations": [
                {"location": {"envId": "f1", "name": "Reports", "type": "FOLDER"}, "relevance": 1.0, "documentExists": false},
                {"location": {"envId": "w1", "name": "Reports WS", "type": "WORKSPACE"}, "relevance": 1.0, "documentExists": false}
            ]
        })))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/filingLocations/C1/quickSearch/configuration"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"includeWorkspaces": false})),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let coordinator = SearchCoordinator::new(h.pipeline.clone());
    let result = completed(coordinator.search("C1", "q1 & reports").await);

    let locations = result.body().expect("missing body")["filingLocations"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0]["location"]["envId"], "f1");

    // The configuration is fetched once per cabinet.
    completed(coordinator.search("C1", "q1 & reports").await);
}

#[tokio::test]
async fn test_activity_log_ships_allowed_levels() {
    let h = TestHarness::new().await;
    Mock::given(method("POST"))
        .and(path("/v1/clientLogging"))
        .and(body_partial_json(json!({"clientLoggingFields": [{"key": "action", "value": "search -> failed"}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&h.server)
        .await;

    let log = ActivityLog::new(LoggingConfig::default(), ClientInfo::default())
        .with_pipeline(h.pipeline.clone());
    log.info("search -> started", None);
    log.error("search -> failed", Some(json!({"status": 500})));

    log.flush().await;
    assert_eq!(h.request_count().await, 1);

    // The log keeps shipping after a flush.
    log.error("search -> failed", None);
    log.flush().await;
    assert_eq!(h.request_count().await, 2);
}
