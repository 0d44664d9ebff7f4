//! Chain errors raised while loading panel data, and the user messages they map to.

mod messages;

pub use messages::{
    ErrorMessages, MessageType, UserMessage, FILING_ERROR_MESSAGE, FILING_SUCCESS_MESSAGE,
    LAST_LOCATION_MESSAGE, PANEL_DEFAULT_ERROR_MESSAGE, SEARCH_DEFAULT_ERROR_MESSAGE,
    UNSUPPORTED_ITEM_MESSAGE,
};

use std::fmt;

use thiserror::Error;

use crate::http::RequestResult;

/// Which loading chain failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainErrorType {
    Cabinet,
    PredictiveSearch,
    QuickSearch,
}

impl fmt::Display for ChainErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainErrorType::Cabinet => write!(f, "cabinet"),
            ChainErrorType::PredictiveSearch => write!(f, "predictive search"),
            ChainErrorType::QuickSearch => write!(f, "quick search"),
        }
    }
}

/// A failed step of a loading chain, carrying the request result that ended it.
#[derive(Debug, Clone, Error)]
#[error("{kind} failed with status {}: {message}", .request_result.status_code())]
pub struct ChainError {
    pub kind: ChainErrorType,
    pub request_result: RequestResult,
    pub message: String,
}

impl ChainError {
    pub fn new(kind: ChainErrorType, request_result: RequestResult) -> Self {
        Self {
            kind,
            request_result,
            message: "No error message".to_string(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn is_authentication_failed(&self) -> bool {
        self.request_result.is_authentication_failed()
    }

    pub fn status_code(&self) -> u16 {
        self.request_result.status_code()
    }
}
