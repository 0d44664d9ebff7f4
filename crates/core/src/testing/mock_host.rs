//! Mock panel host and mail item for testing.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::UserMessage;
use crate::item::{ExtendedFields, ItemDigest, ItemError, MailItem};
use crate::panel::PanelHost;

/// Something the panel asked its host to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    NavigateToLogin,
    NavigateToHostSelection,
    ShowNotification(UserMessage),
    HideNotifications,
}

/// [`PanelHost`] that records every call.
#[derive(Debug, Default)]
pub struct RecordingHost {
    events: Mutex<Vec<HostEvent>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn notifications(&self) -> Vec<UserMessage> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                HostEvent::ShowNotification(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn contains(&self, event: &HostEvent) -> bool {
        self.events().contains(event)
    }

    fn record(&self, event: HostEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[async_trait]
impl PanelHost for RecordingHost {
    async fn navigate_to_login(&self) {
        self.record(HostEvent::NavigateToLogin);
    }

    async fn navigate_to_host_selection(&self) {
        self.record(HostEvent::NavigateToHostSelection);
    }

    async fn show_notification(&self, message: UserMessage) {
        self.record(HostEvent::ShowNotification(message));
    }

    async fn hide_notifications(&self) {
        self.record(HostEvent::HideNotifications);
    }
}

/// [`MailItem`] with a fixed digest and configurable extended-field loading.
#[derive(Debug, Clone)]
pub struct MockMailItem {
    digest: ItemDigest,
    extended: Result<ExtendedFields, ItemError>,
    load_delay: Option<Duration>,
}

impl MockMailItem {
    pub fn new(digest: ItemDigest) -> Self {
        Self {
            digest,
            extended: Ok(ExtendedFields::default()),
            load_delay: None,
        }
    }

    pub fn with_extended(mut self, extended: ExtendedFields) -> Self {
        self.extended = Ok(extended);
        self
    }

    pub fn with_load_error(mut self, error: ItemError) -> Self {
        self.extended = Err(error);
        self
    }

    /// Make `load_extended` take `delay`.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }
}

#[async_trait]
impl MailItem for MockMailItem {
    fn item_class(&self) -> String {
        self.digest.item_class.clone()
    }

    fn digest(&self) -> ItemDigest {
        self.digest.clone()
    }

    async fn load_extended(&self) -> Result<ExtendedFields, ItemError> {
        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }
        self.extended.clone()
    }
}
