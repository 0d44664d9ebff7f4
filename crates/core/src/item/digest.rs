//! Flattened, read-only snapshot of the open mail item.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Longest message body preview sent for prediction.
pub const BODY_MAX_LENGTH: usize = 200;

/// Item fields sent to the prediction endpoint.
///
/// Fields marked `skip_serializing` are kept locally but not part of the
/// prediction request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDigest {
    #[serde(default)]
    pub exchange_item_id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub internet_message_id: String,
    #[serde(default)]
    pub conversation_id: String,
    #[serde(default)]
    pub sent_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to_recipients: Vec<String>,
    #[serde(default)]
    pub cc_recipients: Vec<String>,
    #[serde(default)]
    pub attachment_filenames: Vec<String>,
    #[serde(default)]
    pub from_address: String,
    #[serde(default)]
    pub message_body: Option<String>,

    #[serde(default, skip_serializing)]
    pub item_class: String,
    #[serde(default, skip_serializing)]
    pub from_name: String,
    #[serde(default, skip_serializing)]
    pub custom_properties: Option<Value>,
    #[serde(default, skip_serializing)]
    pub internet_headers: Option<InternetHeaders>,
    #[serde(default, skip_serializing)]
    pub conversation_index: Option<String>,
}

/// Threading headers of the item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternetHeaders {
    pub thread_index: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
}

impl InternetHeaders {
    /// Parse `Thread-Index` and `References` out of raw header text.
    pub fn parse(raw: &str) -> Self {
        let value_of = |name: &str| {
            raw.lines()
                .find_map(|line| {
                    let (key, value) = line.split_once(':')?;
                    key.trim()
                        .eq_ignore_ascii_case(name)
                        .then(|| value.trim().to_string())
                })
                .filter(|v| !v.is_empty())
        };

        Self {
            thread_index: value_of("Thread-Index"),
            references: value_of("References")
                .map(|v| v.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }
}

/// Fields that need extra host round-trips and may arrive late.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtendedFields {
    pub message_body: Option<String>,
    pub custom_properties: Option<Value>,
    pub internet_headers: Option<InternetHeaders>,
    pub conversation_index: Option<String>,
}

impl ItemDigest {
    /// Merge late fields; the body is trimmed and cropped to [`BODY_MAX_LENGTH`].
    pub fn apply_extended(&mut self, extended: ExtendedFields) {
        if let Some(body) = extended.message_body {
            self.message_body = Some(crop(body.trim(), BODY_MAX_LENGTH));
        }
        if extended.custom_properties.is_some() {
            self.custom_properties = extended.custom_properties;
        }
        if extended.internet_headers.is_some() {
            self.internet_headers = extended.internet_headers;
        }
        if extended.conversation_index.is_some() {
            self.conversation_index = extended.conversation_index;
        }
    }
}

/// First `max_chars` characters of `text`.
pub fn crop(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
