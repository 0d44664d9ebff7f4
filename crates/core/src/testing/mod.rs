//! Testing utilities and mock implementations.
//!
//! Mocks stand in for the network, the auth backend, the UI shell and the
//! mail host so coordinators and the panel can be driven end to end.
//!
//! # Example
//!
//! ```rust,ignore
//! use mailfiler_core::testing::{fixtures, MockTransport};
//!
//! let (transport, pipeline) = fixtures::signed_in_pipeline().await;
//! transport.respond("predictiveSearch", fixtures::locations_response(vec![
//!     fixtures::filing_location("a", LocationType::Folder, 0.9, false),
//! ]));
//! ```

mod mock_auth;
mod mock_host;
mod mock_transport;

pub use mock_auth::MockAuthProvider;
pub use mock_host::{HostEvent, MockMailItem, RecordingHost};
pub use mock_transport::{MockTransport, ResponseGate};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::{json, Map, Value};

    use super::{MockAuthProvider, MockTransport};
    use crate::config::{ApiConfig, HttpConfig};
    use crate::http::{HttpPipeline, RawResponse, RequestResult, RetryPolicy};
    use crate::item::{ItemDigest, OUTLOOK_ITEM_TYPE_MESSAGE};
    use crate::location::{FilingLocation, Location, LocationType, LocationsResponse};
    use crate::session::{SessionContext, TokenData};

    pub const API_BASE_URL: &str = "https://product-us.domain.com/v1";

    /// Create a filing location whose envId is `id`.
    pub fn filing_location(
        id: &str,
        location_type: LocationType,
        relevance: f64,
        document_exists: bool,
    ) -> FilingLocation {
        FilingLocation {
            location: Location {
                env_id: Some(id.to_string()),
                name: format!("Location {}", id),
                location_type,
                ..Default::default()
            },
            relevance,
            document_exists,
            extra: Map::new(),
        }
    }

    /// A 200 response listing `locations`.
    pub fn locations_response(locations: Vec<FilingLocation>) -> RawResponse {
        let body = LocationsResponse {
            filing_locations: locations,
            ..Default::default()
        };
        RawResponse::json(
            200,
            &serde_json::to_value(body).unwrap_or(Value::Null),
        )
    }

    /// A successful prediction result for `cabinet_id`.
    pub fn prediction_result(cabinet_id: &str, locations: Vec<FilingLocation>) -> RequestResult {
        let url = format!("{}/filingLocations/{}/predictiveSearch", API_BASE_URL, cabinet_id);
        let now = Utc::now();
        RequestResult::from_response(&url, locations_response(locations), now, now)
    }

    /// A successful quick search result for `cabinet_id`.
    pub fn search_result(cabinet_id: &str, locations: Vec<FilingLocation>) -> RequestResult {
        let url = format!("{}/filingLocations/{}/quickSearch?query=q", API_BASE_URL, cabinet_id);
        let now = Utc::now();
        RequestResult::from_response(&url, locations_response(locations), now, now)
    }

    /// A 200 `/user/cabinets` response with one repository.
    ///
    /// Each entry is `(id, name, is_default)`.
    pub fn cabinets_response(cabinets: &[(&str, &str, bool)]) -> RawResponse {
        let cabinets: Vec<Value> = cabinets
            .iter()
            .map(|(id, name, is_default)| {
                json!({"cabinetId": id, "cabinetName": name, "defaultCabinet": is_default})
            })
            .collect();
        RawResponse::json(
            200,
            &json!({"repositories": [{"repositoryId": "repo-1", "cabinets": cabinets}]}),
        )
    }

    /// A message digest with `subject`.
    pub fn digest(subject: &str) -> ItemDigest {
        ItemDigest {
            item_class: OUTLOOK_ITEM_TYPE_MESSAGE.to_string(),
            subject: subject.to_string(),
            internet_message_id: format!("<{}@example.com>", subject.len()),
            from_address: "ann.lee@example.com".to_string(),
            from_name: "Ann Lee".to_string(),
            ..Default::default()
        }
    }

    /// A session signed in to the default US host with tokens `T0`/`R0`.
    pub async fn signed_in_session() -> Arc<SessionContext> {
        let session = Arc::new(SessionContext::new(&ApiConfig::default()));
        session
            .sign_in(TokenData {
                access_token: "T0".to_string(),
                refresh_token: Some("R0".to_string()),
                host_key: "prod.name.com".to_string(),
            })
            .await;
        session
    }

    /// A pipeline over mocks, with the mocks exposed for scripting and assertions.
    pub async fn signed_in_harness() -> (Arc<MockTransport>, Arc<MockAuthProvider>, Arc<HttpPipeline>) {
        let transport = Arc::new(MockTransport::new());
        let auth = Arc::new(MockAuthProvider::new());
        let pipeline = Arc::new(HttpPipeline::new(
            transport.clone(),
            auth.clone(),
            signed_in_session().await,
            RetryPolicy::from_config(&HttpConfig::default()),
        ));
        (transport, auth, pipeline)
    }

    pub async fn signed_in_pipeline() -> (Arc<MockTransport>, Arc<HttpPipeline>) {
        let (transport, _auth, pipeline) = signed_in_harness().await;
        (transport, pipeline)
    }
}
