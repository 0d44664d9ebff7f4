//! Session state and authentication.

mod auth;
mod context;

pub use auth::{AuthProvider, OAuthProvider};
pub use context::{SessionContext, TokenData, TokenPair};

use thiserror::Error;

/// Errors resolving the signed-in host.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("No user is signed in")]
    NotSignedIn,

    #[error("Unknown host key: {0}")]
    UnknownHost(String),
}

/// Errors from the authentication backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("No refresh token available")]
    MissingRefreshToken,

    #[error("Unknown host key: {0}")]
    UnknownHost(String),

    #[error("Token request rejected with HTTP {0}")]
    Rejected(u16),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
}
