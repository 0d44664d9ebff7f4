//! Location collections held by the filing panel.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::filing::{FileItemResult, FilingStatus};
use crate::http::{BodyError, RequestResult};

use super::naming::{
    alternative_identifier, cabinet_id_from_url, display_name, location_identifier, parent_name,
};
use super::types::{FilingLocation, LocationType, LocationsResponse};

/// One location row in the panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationItem {
    pub identifier: String,
    pub alternative_identifier: String,
    pub display_name: String,
    pub parent_name: String,
    pub relevance: f64,
    pub document_exists: bool,
    pub location_type: LocationType,
    /// Checked in the panel.
    pub is_selected: bool,
    /// Last state confirmed by the server.
    pub is_filed: bool,
    /// The wire location, sent back when filing.
    pub source: FilingLocation,
}

impl LocationItem {
    /// Build a row. Locations the item already exists in start filed and selected.
    pub fn from_filing_location(source: FilingLocation) -> Self {
        let filed = source.document_exists;
        Self {
            identifier: location_identifier(&source.location),
            alternative_identifier: alternative_identifier(&source.location),
            display_name: display_name(&source),
            parent_name: parent_name(&source.location),
            relevance: source.relevance,
            document_exists: source.document_exists,
            location_type: source.location.location_type.clone(),
            is_selected: filed,
            is_filed: filed,
            source,
        }
    }

    /// Same location, matched by identifier or by alternative identifier.
    pub fn same_location(&self, other: &LocationItem) -> bool {
        (!self.identifier.is_empty() && self.identifier == other.identifier)
            || (!self.alternative_identifier.is_empty()
                && self.alternative_identifier == other.alternative_identifier)
    }
}

/// Result of toggling a location's checkbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Selected,
    Deselected,
    /// The last selected location of a filed item cannot be unchecked; the toggle was reverted.
    Rejected,
}

/// Predicted locations for the current item, with the user's selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PredictionData {
    pub cabinet_id: Option<String>,
    /// Opaque prediction list id from the server.
    pub filing_location_list_data: Option<Value>,
    locations: Vec<LocationItem>,
}

impl PredictionData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a (sorted) prediction result.
    pub fn from_result(result: &RequestResult) -> Result<Self, BodyError> {
        let response: LocationsResponse = result.parse_body()?;
        Ok(Self {
            cabinet_id: cabinet_id_from_url(result.request_url()),
            filing_location_list_data: response.filing_location_list_data,
            locations: response
                .filing_locations
                .into_iter()
                .map(LocationItem::from_filing_location)
                .collect(),
        })
    }

    pub fn locations(&self) -> &[LocationItem] {
        &self.locations
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn find(&self, identifier: &str) -> Option<&LocationItem> {
        self.locations
            .iter()
            .find(|l| l.identifier.eq_ignore_ascii_case(identifier))
    }

    /// Local selection differs from the last server-confirmed state.
    pub fn any_changes(&self) -> bool {
        self.locations.iter().any(|l| l.is_selected != l.is_filed)
    }

    pub fn any_filed_locations(&self) -> bool {
        self.locations.iter().any(|l| l.is_filed)
    }

    pub fn any_selected_locations(&self) -> bool {
        self.locations.iter().any(|l| l.is_selected)
    }

    pub fn selected_locations(&self) -> impl Iterator<Item = &LocationItem> {
        self.locations.iter().filter(|l| l.is_selected)
    }

    /// Flip the selection of `identifier`.
    ///
    /// Once the item is filed somewhere, at least one location must stay selected.
    /// Returns `None` if the location is unknown.
    pub fn toggle_selection(&mut self, identifier: &str) -> Option<SelectionChange> {
        let index = self
            .locations
            .iter()
            .position(|l| l.identifier.eq_ignore_ascii_case(identifier))?;

        let now_selected = !self.locations[index].is_selected;
        self.locations[index].is_selected = now_selected;

        if !self.any_filed_locations() || self.any_selected_locations() {
            return Some(if now_selected {
                SelectionChange::Selected
            } else {
                SelectionChange::Deselected
            });
        }

        self.locations[index].is_selected = true;
        Some(SelectionChange::Rejected)
    }

    /// Select a location picked from search, inserting it at the top if it is new.
    pub fn upsert_location(&mut self, mut item: LocationItem) {
        if let Some(existing) = self.locations.iter_mut().find(|l| l.same_location(&item)) {
            existing.is_selected = true;
            return;
        }
        item.is_selected = true;
        self.locations.insert(0, item);
    }

    /// Merge server-confirmed results. Selections the server did not report on stay as they are.
    pub fn apply_filing_result(&mut self, results: &[FileItemResult]) {
        for result in results {
            if result.status != FilingStatus::Succeeded {
                continue;
            }
            match self
                .locations
                .iter_mut()
                .find(|l| l.identifier.eq_ignore_ascii_case(&result.location_id))
            {
                Some(location) => {
                    location.is_filed = result.operation.files_item();
                    location.is_selected = location.is_filed;
                }
                None => {
                    debug!(location = %result.location_id, "Filing result for unknown location");
                }
            }
        }
    }
}

/// Results of the current quick search.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuickSearchData {
    pub cabinet_id: Option<String>,
    locations: Vec<LocationItem>,
}

impl QuickSearchData {
    pub fn from_result(result: &RequestResult) -> Result<Self, BodyError> {
        let response: LocationsResponse = result.parse_body()?;
        Ok(Self {
            cabinet_id: cabinet_id_from_url(result.request_url()),
            locations: response
                .filing_locations
                .into_iter()
                .map(|fl| {
                    let mut item = LocationItem::from_filing_location(fl);
                    item.is_selected = false;
                    item
                })
                .collect(),
        })
    }

    pub fn locations(&self) -> &[LocationItem] {
        &self.locations
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn find(&self, identifier: &str) -> Option<&LocationItem> {
        self.locations
            .iter()
            .find(|l| l.identifier.eq_ignore_ascii_case(identifier))
    }
}
