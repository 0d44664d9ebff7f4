//! The mail item the panel works on.

mod digest;
mod subject;

pub use digest::{crop, ExtendedFields, InternetHeaders, ItemDigest, BODY_MAX_LENGTH};
pub use subject::{CustomSubject, NO_SUBJECT, SUBJECT_MAX_LENGTH};

use async_trait::async_trait;
use thiserror::Error;

pub const OUTLOOK_ITEM_TYPE_MESSAGE: &str = "IPM.Note";
pub const OUTLOOK_ITEM_TYPE_POST: &str = "IPM.Post";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ItemError {
    #[error("This item type is not supported: {0}")]
    Unsupported(String),

    #[error("Failed to read item: {0}")]
    Host(String),
}

/// Read access to the item open in the mail host.
#[async_trait]
pub trait MailItem: Send + Sync {
    fn item_class(&self) -> String;

    /// Fields available immediately.
    fn digest(&self) -> ItemDigest;

    /// Body, custom properties and headers. May be slow.
    async fn load_extended(&self) -> Result<ExtendedFields, ItemError>;
}

/// Posts are not filed; every other item class is.
pub fn is_supported_item(item_class: &str) -> bool {
    !item_class.is_empty() && !item_class.eq_ignore_ascii_case(OUTLOOK_ITEM_TYPE_POST)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_items() {
        assert!(is_supported_item(OUTLOOK_ITEM_TYPE_MESSAGE));
        assert!(is_supported_item("IPM.Appointment"));
        assert!(!is_supported_item("ipm.post"));
        assert!(!is_supported_item(""));
    }
}
