//! Panel session integration tests.
//!
//! These run the panel over SQLite storage shared between panel instances:
//! - The user's default cabinet survives a restart
//! - The cabinet list is served from cache within its lifetime
//! - Logging out stops item tracking and drops the cabinet cache

use std::sync::Arc;

use tempfile::TempDir;

use mailfiler_core::config::{StorageBackend, StorageConfig};
use mailfiler_core::location::LocationType;
use mailfiler_core::testing::{fixtures, HostEvent, MockAuthProvider, MockMailItem, MockTransport, RecordingHost};
use mailfiler_core::{open_storage, Config, FilingPanel, HttpPipeline, MailItem};

struct PanelInstance {
    transport: Arc<MockTransport>,
    auth: Arc<MockAuthProvider>,
    pipeline: Arc<HttpPipeline>,
    host: Arc<RecordingHost>,
    panel: FilingPanel,
}

/// Test helper opening panels over one database file.
struct TestHarness {
    config: Config,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = Config {
            storage: StorageConfig {
                backend: StorageBackend::Sqlite,
                path: temp_dir.path().join("mailfiler.db"),
            },
            ..Default::default()
        };
        Self {
            config,
            _temp_dir: temp_dir,
        }
    }

    /// A fresh panel with its own session and network, sharing the database.
    async fn open_panel(&self) -> PanelInstance {
        let (transport, auth, pipeline) = fixtures::signed_in_harness().await;
        transport.respond(
            "/user/cabinets",
            fixtures::cabinets_response(&[("c1", "Main", true), ("c2", "Projects", false)]),
        );
        transport.respond(
            "predictiveSearch",
            fixtures::locations_response(vec![
                fixtures::filing_location("f1", LocationType::Folder, 0.8, false),
                fixtures::filing_location("w1", LocationType::Workspace, 0.5, false),
            ]),
        );

        let storage = open_storage(&self.config.storage).expect("Failed to open storage");
        let host = Arc::new(RecordingHost::new());
        let panel = FilingPanel::new(pipeline.clone(), storage, host.clone(), &self.config);
        PanelInstance {
            transport,
            auth,
            pipeline,
            host,
            panel,
        }
    }
}

fn item(subject: &str) -> Option<Arc<dyn MailItem>> {
    Some(Arc::new(MockMailItem::new(fixtures::digest(subject))))
}

#[tokio::test]
async fn test_default_cabinet_survives_restart() {
    let harness = TestHarness::new();

    let first = harness.open_panel().await;
    first.panel.initialize(item("Invoice 42")).await;
    assert_eq!(first.panel.state().await.current_cabinet_id(), Some("c1"));

    first.panel.cabinet_changed("c2").await;
    let state = first.panel.state().await;
    assert_eq!(state.current_cabinet_id(), Some("c2"));
    assert!(state.prediction_data.is_some());
    assert_eq!(
        first
            .transport
            .request_count("/filingLocations/c2/predictiveSearch"),
        1
    );

    let second = harness.open_panel().await;
    second.panel.initialize(item("Invoice 43")).await;

    let state = second.panel.state().await;
    assert_eq!(state.current_cabinet_id(), Some("c2"));
    assert!(state.is_application_data_loaded);
    assert_eq!(
        second
            .transport
            .request_count("/filingLocations/c2/predictiveSearch"),
        1
    );
    assert_eq!(
        second.pipeline.session().default_cabinet_id().await.as_deref(),
        Some("c2")
    );
}

#[tokio::test]
async fn test_cabinet_list_served_from_cache() {
    let harness = TestHarness::new();

    let first = harness.open_panel().await;
    first.panel.initialize(item("Invoice 42")).await;
    assert_eq!(first.transport.request_count("/user/cabinets"), 1);

    let second = harness.open_panel().await;
    second.panel.initialize(item("Invoice 42")).await;

    assert_eq!(second.transport.request_count("/user/cabinets"), 0);
    assert!(second.panel.state().await.has_cabinets());
}

#[tokio::test]
async fn test_log_out_stops_tracking_and_clears_cache() {
    let harness = TestHarness::new();

    let first = harness.open_panel().await;
    first.panel.initialize(item("Invoice 42")).await;
    first.panel.log_out().await;

    assert_eq!(first.auth.log_out_count(), 1);
    assert!(!first.pipeline.session().is_signed_in().await);
    assert!(first.host.contains(&HostEvent::NavigateToHostSelection));
    assert!(!first.panel.state().await.is_tracking_items);

    // Item changes are ignored once tracking stopped.
    let requests = first.transport.requests().len();
    first.panel.item_changed(item("Invoice 43")).await;
    assert_eq!(first.transport.requests().len(), requests);

    let second = harness.open_panel().await;
    second.panel.initialize(item("Invoice 42")).await;
    assert_eq!(second.transport.request_count("/user/cabinets"), 1);
}
