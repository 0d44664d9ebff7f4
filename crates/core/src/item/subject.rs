//! Subject used as the document name when filing.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::digest::{crop, ItemDigest};

pub const NO_SUBJECT: &str = "No name";
pub const SUBJECT_MAX_LENGTH: usize = 1000;

/// Characters not allowed in a filed document name.
static INVALID_CHARACTERS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[/\\*?":|<>]"#).unwrap());

/// Editable subject of the current item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomSubject {
    original_value: Option<String>,
    current_value: Option<String>,
    from_name: String,
    sent_date: Option<String>,
}

impl CustomSubject {
    pub fn new(digest: &ItemDigest) -> Self {
        let original = Some(digest.subject.clone()).filter(|s| !s.is_empty());
        Self {
            current_value: Some(original.clone().unwrap_or_else(|| NO_SUBJECT.to_string())),
            original_value: original,
            from_name: digest.from_name.clone(),
            sent_date: digest
                .sent_date
                .map(|d| d.format("%m_%d_%Y %I_%M %p").to_string()),
        }
    }

    pub fn original_value(&self) -> Option<&str> {
        self.original_value.as_deref()
    }

    pub fn current_value(&self) -> Option<&str> {
        self.current_value.as_deref()
    }

    pub fn set_current_value(&mut self, subject: impl Into<String>) {
        self.current_value = Some(subject.into());
    }

    /// The subject still has usable characters after validation.
    pub fn is_defined(&self) -> bool {
        match &self.current_value {
            Some(value) if value != NO_SUBJECT => {
                !INVALID_CHARACTERS.replace_all(value, "").trim().is_empty()
            }
            _ => false,
        }
    }

    /// Document name to file under.
    ///
    /// Falls back to "Message from {sender} on {date}" when no usable subject
    /// is set. Invalid characters are removed.
    pub fn filing_value(&self) -> String {
        let value = match (&self.current_value, self.is_defined()) {
            (Some(current), true) => current.clone(),
            _ => {
                let mut fallback = "Message".to_string();
                if !self.from_name.is_empty() {
                    fallback.push_str(" from ");
                    fallback.push_str(&self.from_name);
                }
                if let Some(date) = &self.sent_date {
                    fallback.push_str(" on ");
                    fallback.push_str(date);
                }
                fallback
            }
        };

        crop(&INVALID_CHARACTERS.replace_all(&value, ""), SUBJECT_MAX_LENGTH)
    }

    pub fn reset(&mut self) {
        self.original_value = None;
        self.current_value = None;
    }
}
