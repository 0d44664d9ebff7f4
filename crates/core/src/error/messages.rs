//! Status code to user message tables.

use serde::Serialize;

pub const PANEL_DEFAULT_ERROR_MESSAGE: &str = "There is an issue with getting your filing locations";
pub const SEARCH_DEFAULT_ERROR_MESSAGE: &str = "Error in search occurred";
pub const UNSUPPORTED_ITEM_MESSAGE: &str = "This item type is not supported.";
pub const LAST_LOCATION_MESSAGE: &str =
    "This email is already filed. At least one filing location must stay selected.";
pub const FILING_SUCCESS_MESSAGE: &str = "Filed";
pub const FILING_ERROR_MESSAGE: &str = "Filing failed";

const PANEL_LOCATIONS_UNAVAILABLE: &str = "The server could not display your filing locations";
const NO_CONNECTION: &str = "There is no internet connection available";
const SERVER_NOT_ACCESSIBLE: &str = "The server is not accessible";
const NO_SEARCH_RESULTS: &str = "No search results found";

const PANEL_ERRORS: &[(u16, &str)] = &[
    (500, PANEL_LOCATIONS_UNAVAILABLE),
    (502, NO_CONNECTION),
    (404, PANEL_LOCATIONS_UNAVAILABLE),
    (429, PANEL_LOCATIONS_UNAVAILABLE),
    (200, PANEL_LOCATIONS_UNAVAILABLE),
];

const SEARCH_ERRORS: &[(u16, &str)] = &[
    (500, SERVER_NOT_ACCESSIBLE),
    (501, SERVER_NOT_ACCESSIBLE),
    (502, SERVER_NOT_ACCESSIBLE),
    (503, SERVER_NOT_ACCESSIBLE),
    (504, SERVER_NOT_ACCESSIBLE),
    (505, SERVER_NOT_ACCESSIBLE),
    (200, NO_SEARCH_RESULTS),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Info,
    Warning,
    Error,
    Success,
}

/// Text shown to the user with its severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserMessage {
    pub text: String,
    pub kind: MessageType,
}

impl UserMessage {
    pub fn new(text: impl Into<String>, kind: MessageType) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, MessageType::Error)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(text, MessageType::Warning)
    }
}

/// Lookup of user messages by HTTP status.
///
/// A 200 means the request worked but returned nothing useful, so it maps to
/// an info message; everything else is an error.
pub struct ErrorMessages;

impl ErrorMessages {
    /// Message for a failed cabinet or prediction load.
    pub fn panel_message(status_code: u16) -> UserMessage {
        lookup(status_code, PANEL_ERRORS, PANEL_DEFAULT_ERROR_MESSAGE)
    }

    /// Message for a failed quick search.
    pub fn search_message(status_code: u16) -> UserMessage {
        lookup(status_code, SEARCH_ERRORS, SEARCH_DEFAULT_ERROR_MESSAGE)
    }
}

fn lookup(status_code: u16, table: &[(u16, &str)], default: &str) -> UserMessage {
    let text = table
        .iter()
        .find(|(code, _)| *code == status_code)
        .map(|(_, text)| *text)
        .unwrap_or(default);
    let kind = if status_code == 200 {
        MessageType::Info
    } else {
        MessageType::Error
    };
    UserMessage::new(text, kind)
}
