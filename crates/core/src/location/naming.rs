//! Display names and identifiers derived from wire locations.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde_json::Value;

use super::types::{FilingLocation, Location};

static CABINET_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"filingLocations/([^/?]+)/").unwrap());

/// `" (.../ {parent})"` or an empty string when there is no named parent.
pub fn parent_name(location: &Location) -> String {
    match &location.parent_location {
        Some(parent) if !parent.name.is_empty() => format!(" (.../ {})", parent.name),
        _ => String::new(),
    }
}

/// Location name followed by its parent suffix.
pub fn display_name(filing_location: &FilingLocation) -> String {
    let location = &filing_location.location;
    format!("{}{}", location.name, parent_name(location))
}

/// Upper-cased environment id, or an empty string.
pub fn location_identifier(location: &Location) -> String {
    location
        .env_id
        .as_deref()
        .map(str::to_uppercase)
        .unwrap_or_default()
}

/// Upper-cased JSON array of the organizing, workspace and workspace parent
/// attributes that are present. Empty when none are.
pub fn alternative_identifier(location: &Location) -> String {
    let attributes: Vec<&Value> = [
        &location.organizing_attribute,
        &location.workspace_attribute,
        &location.workspace_parent_attribute,
    ]
    .into_iter()
    .flatten()
    .filter(|v| is_truthy(v))
    .collect();

    if attributes.is_empty() {
        return String::new();
    }
    serde_json::to_string(&attributes)
        .map(|s| s.to_uppercase())
        .unwrap_or_default()
}

/// Cabinet id embedded in a `.../filingLocations/{cabinet}/...` request URL.
pub fn cabinet_id_from_url(request_url: &str) -> Option<String> {
    CABINET_ID_PATTERN
        .captures(request_url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
