//! Wire types of the prediction and quick search endpoints.
//!
//! Unknown fields are kept in `extra` so a rewritten body still carries
//! everything the server sent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of a filing location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LocationType {
    Folder,
    Filter,
    Workspace,
    /// The server sent no type.
    #[default]
    Unknown,
    /// A type this client does not know; the raw value is preserved.
    Other(String),
}

impl LocationType {
    pub fn is_unknown(&self) -> bool {
        matches!(self, LocationType::Unknown)
    }

    pub fn as_str(&self) -> &str {
        match self {
            LocationType::Folder => "FOLDER",
            LocationType::Filter => "FILTER",
            LocationType::Workspace => "WORKSPACE",
            LocationType::Unknown => "",
            LocationType::Other(raw) => raw,
        }
    }
}

impl From<String> for LocationType {
    fn from(raw: String) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "FOLDER" => LocationType::Folder,
            "FILTER" => LocationType::Filter,
            "WORKSPACE" => LocationType::Workspace,
            "" => LocationType::Unknown,
            _ => LocationType::Other(raw),
        }
    }
}

impl From<LocationType> for String {
    fn from(location_type: LocationType) -> Self {
        location_type.as_str().to_string()
    }
}

/// Body of a prediction or quick search response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationsResponse {
    #[serde(default)]
    pub filing_locations: Vec<FilingLocation>,
    /// Opaque prediction list id, echoed back when filing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filing_location_list_data: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A candidate location with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingLocation {
    pub location: Location,
    #[serde(default)]
    pub relevance: f64,
    #[serde(default)]
    pub document_exists: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "LocationType::is_unknown")]
    pub location_type: LocationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cabinet_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_location: Option<ParentLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizing_attribute: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_attribute: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_parent_attribute: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentLocation {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Per-cabinet quick search configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cabinet_id: Option<String>,
    #[serde(default)]
    pub include_filters: Option<bool>,
    #[serde(default)]
    pub include_workspaces: Option<bool>,
    #[serde(default)]
    pub include_folders: Option<bool>,
}

impl SearchConfiguration {
    /// Location types to drop from search results. Only an explicit `false` excludes.
    pub fn excluded_types(&self) -> Vec<LocationType> {
        let mut excluded = Vec::new();
        if self.include_filters == Some(false) {
            excluded.push(LocationType::Filter);
        }
        if self.include_workspaces == Some(false) {
            excluded.push(LocationType::Workspace);
        }
        if self.include_folders == Some(false) {
            excluded.push(LocationType::Folder);
        }
        excluded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_location_type_round_trips_unknown_values() {
        let location: Location =
            serde_json::from_value(json!({"name": "x", "type": "MATTER"})).unwrap();
        assert_eq!(location.location_type, LocationType::Other("MATTER".to_string()));

        let value = serde_json::to_value(&location).unwrap();
        assert_eq!(value["type"], "MATTER");
    }

    #[test]
    fn test_response_keeps_unknown_fields() {
        let body = json!({
            "filingLocations": [{
                "location": {"envId": "a1", "name": "Folder A", "type": "FOLDER", "path": "/x"},
                "relevance": 0.5,
                "documentExists": false,
                "reason": "sender"
            }],
            "filingLocationListData": "list-1",
            "searchId": 42
        });

        let parsed: LocationsResponse = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(parsed.filing_locations[0].location.location_type, LocationType::Folder);
        assert_eq!(serde_json::to_value(&parsed).unwrap(), body);
    }

    #[test]
    fn test_excluded_types() {
        let config: SearchConfiguration =
            serde_json::from_value(json!({"includeFilters": false, "includeFolders": true}))
                .unwrap();
        assert_eq!(config.excluded_types(), vec![LocationType::Filter]);

        let all_off = SearchConfiguration {
            cabinet_id: None,
            include_filters: Some(false),
            include_workspaces: Some(false),
            include_folders: Some(false),
        };
        assert_eq!(all_off.excluded_types().len(), 3);
        assert!(SearchConfiguration::default().excluded_types().is_empty());
    }
}
