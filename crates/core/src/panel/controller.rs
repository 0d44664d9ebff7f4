use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::activity::{ActivityLog, ClientInfo};
use crate::cabinet::{CabinetData, CabinetService};
use crate::cancellation::{cancel_after, Deadline, OperationSlot};
use crate::config::Config;
use crate::error::{
    ChainError, ChainErrorType, ErrorMessages, MessageType, UserMessage, FILING_ERROR_MESSAGE,
    FILING_SUCCESS_MESSAGE, LAST_LOCATION_MESSAGE, UNSUPPORTED_ITEM_MESSAGE,
};
use crate::filing::{FilingStatus, FilingTask, FilingTaskType};
use crate::http::{HttpPipeline, RequestResult};
use crate::item::{is_supported_item, CustomSubject, ExtendedFields, MailItem};
use crate::location::{PredictionData, QuickSearchData, SelectionChange};
use crate::prediction::PredictionCoordinator;
use crate::search::SearchCoordinator;
use crate::storage::Storage;

use super::traits::PanelHost;
use super::types::PanelState;

/// Reconciles item changes, cabinet loads, predictions and searches into [`PanelState`].
///
/// The state lock is never held across an await.
pub struct FilingPanel {
    pipeline: Arc<HttpPipeline>,
    cabinets: CabinetService,
    predictions: PredictionCoordinator,
    search: SearchCoordinator,
    host: Arc<dyn PanelHost>,
    activity: ActivityLog,
    item_slot: OperationSlot,
    initialization_timeout: Duration,
    state: RwLock<PanelState>,
}

impl FilingPanel {
    pub fn new(
        pipeline: Arc<HttpPipeline>,
        storage: Arc<dyn Storage>,
        host: Arc<dyn PanelHost>,
        config: &Config,
    ) -> Self {
        Self {
            cabinets: CabinetService::from_config(pipeline.clone(), storage, config),
            predictions: PredictionCoordinator::new(pipeline.clone()),
            search: SearchCoordinator::new(pipeline.clone()),
            activity: ActivityLog::new(config.logging.clone(), ClientInfo::default()),
            item_slot: OperationSlot::new("item_changed"),
            initialization_timeout: Duration::from_millis(config.item.initialization_timeout_ms),
            state: RwLock::new(PanelState::default()),
            pipeline,
            host,
        }
    }

    pub fn with_activity_log(mut self, activity: ActivityLog) -> Self {
        self.activity = activity;
        self
    }

    /// Snapshot of the current state.
    pub async fn state(&self) -> PanelState {
        self.state.read().await.clone()
    }

    pub fn cabinets(&self) -> &CabinetService {
        &self.cabinets
    }

    /// Start tracking items and load data for `item`.
    pub async fn initialize(&self, item: Option<Arc<dyn MailItem>>) {
        self.state.write().await.is_tracking_items = true;
        self.cabinets.restore_user_default_cabinet_id().await;

        match item.filter(|i| is_supported_item(&i.item_class())) {
            Some(item) => {
                self.activity.debug("panel -> initialize", None);
                let token = self.item_slot.supersede();
                self.open_item(item, token).await;
            }
            None => {
                self.state.write().await.message = Some(UserMessage::error(UNSUPPORTED_ITEM_MESSAGE));
                self.activity
                    .error("panel -> initialize", Some(json!(UNSUPPORTED_ITEM_MESSAGE)));
            }
        }
    }

    /// The user switched to another item.
    ///
    /// Pending requests for the previous item are cancelled and its state is
    /// dropped before the new item is opened.
    pub async fn item_changed(&self, item: Option<Arc<dyn MailItem>>) {
        if !self.state.read().await.is_tracking_items {
            debug!("Item change ignored, not tracking items");
            return;
        }

        self.host.hide_notifications().await;
        self.cancel_pending_requests();
        {
            let mut state = self.state.write().await;
            state.clear_search_data();
            state.close_search();
            state.clear_prediction_data();
        }
        let token = self.item_slot.supersede();

        match item.filter(|i| is_supported_item(&i.item_class())) {
            Some(item) => self.open_item(item, token).await,
            None => {
                {
                    let mut state = self.state.write().await;
                    if let Some(subject) = state.custom_subject.as_mut() {
                        subject.reset();
                    }
                    state.is_application_data_loaded = false;
                    state.message = Some(UserMessage::error(UNSUPPORTED_ITEM_MESSAGE));
                }
                self.activity
                    .error("panel -> item_changed", Some(json!(UNSUPPORTED_ITEM_MESSAGE)));
            }
        }
    }

    async fn open_item(&self, item: Arc<dyn MailItem>, token: CancellationToken) {
        let digest = item.digest();
        {
            let mut state = self.state.write().await;
            if token.is_cancelled() {
                return;
            }
            state.custom_subject = Some(CustomSubject::new(&digest));
            state.digest = Some(digest);
        }

        match cancel_after(item.load_extended(), self.initialization_timeout, Some(&token)).await {
            Deadline::Completed(Ok(extended)) => self.apply_extended_fields(extended, &token).await,
            Deadline::Completed(Err(e)) => {
                warn!(error = %e, "Failed to read extended item fields");
            }
            Deadline::Elapsed => {
                debug!(
                    timeout_ms = self.initialization_timeout.as_millis() as u64,
                    "Item initialization timed out, loading anyway"
                );
            }
            Deadline::Cancelled => {
                self.activity
                    .debug("panel -> open_item -> cancel_after -> cancelled", None);
                return;
            }
        }

        if token.is_cancelled() {
            self.activity.debug("panel -> open_item -> superseded", None);
            return;
        }
        self.load_data().await;
    }

    /// Merge extended item fields into the open item's digest unless it was superseded.
    pub(super) async fn apply_extended_fields(&self, extended: ExtendedFields, token: &CancellationToken) {
        let mut state = self.state.write().await;
        if token.is_cancelled() {
            return;
        }
        if let Some(digest) = state.digest.as_mut() {
            digest.apply_extended(extended);
        }
    }

    /// Load cabinets if there are none yet, then predictions for the current cabinet.
    pub async fn load_data(&self) {
        self.activity.debug("panel -> load_data", None);

        let cabinet_id = {
            let mut state = self.state.write().await;
            state.is_application_data_loaded = false;
            state.is_file_button_enabled = false;
            state
                .has_cabinets()
                .then(|| state.current_cabinet_id().map(str::to_string))
                .flatten()
        };

        match cabinet_id {
            Some(cabinet_id) => self.refresh_predictions(&cabinet_id).await,
            None => {
                if let Err(e) = self.loading_chain().await {
                    self.handle_chain_error(e).await;
                }
            }
        }
    }

    /// The user picked another cabinet.
    ///
    /// A search still running against the previous cabinet is cancelled.
    pub async fn cabinet_changed(&self, cabinet_id: &str) {
        self.activity
            .debug("panel -> cabinet_changed", Some(json!(cabinet_id)));
        {
            let mut state = self.state.write().await;
            self.search.cancel_pending_requests();
            state.close_search();
            state.clear_search_data();
            if let Some(cabinets) = state.cabinet_data.as_mut() {
                cabinets.select(cabinet_id);
            }
        }
        self.cabinets.set_user_default_cabinet_id(cabinet_id).await;
        self.refresh_predictions(cabinet_id).await;
    }

    /// Quick search in the current cabinet.
    ///
    /// Queries shorter than `min_input_length` characters after trimming are
    /// ignored. A zero minimum is treated as one.
    pub async fn search(&self, query_text: &str, min_input_length: usize) {
        let text = query_text.trim();
        if text.is_empty() || text.chars().count() < min_input_length.max(1) {
            return;
        }

        // Issued under the state lock; `cabinet_changed` cancels under the same lock.
        let (cabinet_id, token) = {
            let mut state = self.state.write().await;
            let Some(cabinet_id) = state.current_cabinet_id().map(str::to_string) else {
                debug!("Search ignored, no cabinet loaded");
                return;
            };
            state.is_search_in_progress = true;
            state.clear_search_data();
            (cabinet_id, self.search.supersede())
        };

        let Some(result) = self
            .search
            .search_with(&cabinet_id, text, &token)
            .await
            .into_result()
        else {
            debug!(query = text, "Search superseded");
            return;
        };
        if let Err(e) = self.set_quick_search_data(result, &token).await {
            self.handle_chain_error(e).await;
        }
    }

    /// Open or close the search popup.
    pub async fn set_search_active(&self, active: bool) {
        let mut state = self.state.write().await;
        if active {
            state.is_search_active = true;
        } else {
            state.close_search();
        }
    }

    /// Add a search hit to the panel, selected. Returns false if `identifier` is not a current hit.
    pub async fn add_search_location(&self, identifier: &str) -> bool {
        let mut state = self.state.write().await;
        let Some(item) = state
            .quick_search_data
            .as_ref()
            .and_then(|s| s.find(identifier))
            .cloned()
        else {
            return false;
        };

        if state.prediction_data.is_none() {
            let mut predictions = PredictionData::new();
            predictions.cabinet_id = state.current_cabinet_id().map(str::to_string);
            state.prediction_data = Some(predictions);
        }
        if let Some(predictions) = state.prediction_data.as_mut() {
            predictions.upsert_location(item);
        }

        state.close_search();
        state.is_file_button_enabled = state.prediction_changes();
        true
    }

    /// Toggle a location's checkbox.
    pub async fn checked_changed(&self, identifier: &str) -> Option<SelectionChange> {
        let change = {
            let mut state = self.state.write().await;
            let change = state.prediction_data.as_mut()?.toggle_selection(identifier)?;
            state.is_file_button_enabled = state.prediction_changes();
            change
        };

        if change == SelectionChange::Rejected {
            self.host
                .show_notification(UserMessage::warning(LAST_LOCATION_MESSAGE))
                .await;
        }
        Some(change)
    }

    /// Set the document name used for filing.
    pub async fn submit_rename(&self, subject: &str) {
        let mut state = self.state.write().await;
        if let Some(custom_subject) = state.custom_subject.as_mut() {
            custom_subject.set_current_value(subject);
        }
        let filed = state
            .prediction_data
            .as_ref()
            .map(|p| p.any_filed_locations())
            .unwrap_or(false);
        state.is_file_button_enabled = state.prediction_changes() || filed;
        debug!(subject = subject, "Subject renamed");
    }

    /// Merge a finished filing task into the panel.
    pub async fn apply_filing_task(&self, task: &FilingTask) {
        let is_success = task.response.status == FilingStatus::Succeeded;
        {
            let mut state = self.state.write().await;
            if is_success {
                if let Some(predictions) = state.prediction_data.as_mut() {
                    predictions.apply_filing_result(&task.response.file_item_results);
                }
            }
            state.is_file_button_enabled = state.prediction_changes();
        }

        self.activity.info(
            "panel -> apply_filing_task",
            Some(json!({ "task": task.id, "succeeded": is_success })),
        );

        match task.task_type {
            FilingTaskType::Tracking => self.host.hide_notifications().await,
            FilingTaskType::Regular if is_success => {
                self.host
                    .show_notification(UserMessage::new(FILING_SUCCESS_MESSAGE, MessageType::Success))
                    .await
            }
            FilingTaskType::Regular => {
                self.host
                    .show_notification(UserMessage::error(FILING_ERROR_MESSAGE))
                    .await
            }
        }
    }

    /// Sign out, stop tracking items and go back to host selection.
    pub async fn log_out(&self) {
        self.pipeline.auth().log_out(self.pipeline.session()).await;
        self.stop_tracking_items().await;
        self.cabinets.clear_cache();
        self.host.navigate_to_host_selection().await;
    }

    /// Route a failed loading step to the user.
    pub async fn handle_chain_error(&self, error: ChainError) {
        self.activity.error(
            "panel -> handle_chain_error",
            Some(json!({
                "kind": error.kind.to_string(),
                "status": error.status_code(),
                "url": error.request_result.request_url(),
            })),
        );

        if error.is_authentication_failed() {
            self.stop_tracking_items().await;
            self.cabinets.clear_cache();
            self.host.navigate_to_login().await;
            return;
        }

        let mut state = self.state.write().await;
        match error.kind {
            ChainErrorType::Cabinet | ChainErrorType::PredictiveSearch => {
                let message = ErrorMessages::panel_message(error.status_code());
                state.message = Some(UserMessage::error(message.text));
                state.is_application_data_loaded = true;
            }
            ChainErrorType::QuickSearch => {
                if !state.is_search_in_progress && state.is_search_active {
                    state.search_message = Some(ErrorMessages::search_message(error.status_code()));
                }
            }
        }
    }

    fn cancel_pending_requests(&self) {
        self.predictions.cancel_pending_requests();
        self.search.cancel_pending_requests();
    }

    async fn stop_tracking_items(&self) {
        self.item_slot.cancel();
        self.cancel_pending_requests();
        self.state.write().await.is_tracking_items = false;
    }

    async fn loading_chain(&self) -> Result<(), ChainError> {
        let Some(result) = self.cabinets.load_cabinets().await.into_result() else {
            return Ok(());
        };
        let cabinet_id = self.set_cabinet_data(result).await?;
        self.load_predictions(&cabinet_id).await
    }

    async fn set_cabinet_data(&self, result: RequestResult) -> Result<String, ChainError> {
        let current = self.cabinets.current_cabinet_id().await;
        let data = CabinetData::new(Some(&result), current.as_deref());
        let has_cabinets = data.has_cabinets();
        let cabinet_id = data.current_cabinet_id().to_string();
        self.state.write().await.cabinet_data = Some(data);

        if !result.is_successful() || !has_cabinets {
            return Err(ChainError::new(ChainErrorType::Cabinet, result));
        }
        Ok(cabinet_id)
    }

    async fn refresh_predictions(&self, cabinet_id: &str) {
        self.state.write().await.clear_prediction_data();
        if let Err(e) = self.load_predictions(cabinet_id).await {
            self.handle_chain_error(e).await;
        }
    }

    async fn load_predictions(&self, cabinet_id: &str) -> Result<(), ChainError> {
        let token = self.predictions.supersede();
        let digest = self.state.read().await.digest.clone().unwrap_or_default();
        let Some(result) = self
            .predictions
            .request_predictions(cabinet_id, &digest, &token)
            .await
            .into_result()
        else {
            debug!(cabinet = cabinet_id, "Predictions superseded");
            return Ok(());
        };

        let data = result
            .is_successful()
            .then(|| PredictionData::from_result(&result).ok())
            .flatten()
            .filter(|data| !data.is_empty());

        let mut state = self.state.write().await;
        if token.is_cancelled() {
            debug!(cabinet = cabinet_id, "Predictions superseded before publishing");
            return Ok(());
        }
        let Some(data) = data else {
            return Err(ChainError::new(ChainErrorType::PredictiveSearch, result));
        };
        state.is_file_button_enabled = data.any_changes();
        state.prediction_data = Some(data);
        state.is_application_data_loaded = true;
        Ok(())
    }

    async fn set_quick_search_data(
        &self,
        result: RequestResult,
        token: &CancellationToken,
    ) -> Result<(), ChainError> {
        let mut state = self.state.write().await;
        if token.is_cancelled() {
            return Ok(());
        }
        state.is_search_in_progress = false;

        let data = result
            .is_successful()
            .then(|| QuickSearchData::from_result(&result).ok())
            .flatten()
            .filter(|data| !data.is_empty());
        match data {
            Some(data) => {
                state.quick_search_data = Some(data);
                Ok(())
            }
            None => Err(ChainError::new(ChainErrorType::QuickSearch, result)),
        }
    }
}
