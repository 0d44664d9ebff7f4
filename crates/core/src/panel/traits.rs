use async_trait::async_trait;

use crate::error::UserMessage;

/// The UI shell hosting the filing panel.
#[async_trait]
pub trait PanelHost: Send + Sync {
    async fn navigate_to_login(&self);

    async fn navigate_to_host_selection(&self);

    async fn show_notification(&self, message: UserMessage);

    async fn hide_notifications(&self);
}
