use serde::Serialize;

use crate::cabinet::CabinetData;
use crate::error::UserMessage;
use crate::item::{CustomSubject, ItemDigest};
use crate::location::{PredictionData, QuickSearchData};

/// Everything the panel renders.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PanelState {
    #[serde(skip)]
    pub cabinet_data: Option<CabinetData>,
    pub prediction_data: Option<PredictionData>,
    pub quick_search_data: Option<QuickSearchData>,
    #[serde(skip)]
    pub custom_subject: Option<CustomSubject>,
    pub digest: Option<ItemDigest>,
    /// Message shown in place of the location list.
    pub message: Option<UserMessage>,
    /// Message shown in the search popup.
    pub search_message: Option<UserMessage>,
    pub is_search_active: bool,
    pub is_search_in_progress: bool,
    pub is_file_button_enabled: bool,
    pub is_application_data_loaded: bool,
    /// Item change events are handled. Cleared on sign-out and authentication failure.
    pub is_tracking_items: bool,
}

impl PanelState {
    pub fn current_cabinet_id(&self) -> Option<&str> {
        self.cabinet_data.as_ref().map(|c| c.current_cabinet_id())
    }

    pub fn has_cabinets(&self) -> bool {
        self.cabinet_data
            .as_ref()
            .map(|c| c.has_cabinets())
            .unwrap_or(false)
    }

    pub(crate) fn prediction_changes(&self) -> bool {
        self.prediction_data
            .as_ref()
            .map(|p| p.any_changes())
            .unwrap_or(false)
    }

    pub(crate) fn clear_search_data(&mut self) {
        self.quick_search_data = None;
        self.search_message = None;
    }

    pub(crate) fn close_search(&mut self) {
        self.is_search_active = false;
        self.is_search_in_progress = false;
    }

    pub(crate) fn clear_prediction_data(&mut self) {
        self.prediction_data = None;
        self.message = None;
    }
}
