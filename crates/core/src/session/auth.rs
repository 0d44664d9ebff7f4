//! Token refresh and login URL construction.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{ApiConfig, AuthConfig, HostData};

use super::{AuthError, SessionContext, TokenData, TokenPair};

/// OAuth grant used when exchanging a refresh token.
const GRANT_TYPE_REFRESH_TOKEN: &str = "refresh_token";
/// Query parameter carrying the host key through the login redirect.
const HOST_PARAMETER: &str = "sc";

/// Authentication backend.
///
/// The pipeline calls [`AuthProvider::refresh_token`] after a 401 and stores the
/// returned pair itself; implementations never write the session directly.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Exchange the current refresh token for a new access token.
    async fn refresh_token(&self, current: &TokenData) -> Result<TokenPair, AuthError>;

    /// URL the user is sent to for an interactive login on `host_key`.
    fn login_request_url(&self, host_key: &str) -> Result<String, AuthError>;

    /// Sign the user out and forget the session tokens.
    async fn log_out(&self, session: &SessionContext);
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// OAuth 2 provider talking to the `/v1/OAuth` endpoint of the signed-in host.
pub struct OAuthProvider {
    client: Client,
    scheme: String,
    hosts: Vec<HostData>,
    auth: AuthConfig,
}

impl OAuthProvider {
    pub fn new(api: &ApiConfig, auth: &AuthConfig, timeout_secs: u32) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs as u64))
            .build()
            .map_err(|e| AuthError::Network(e.to_string()))?;

        Ok(Self {
            client,
            scheme: api.scheme.clone(),
            hosts: api.hosts.clone(),
            auth: auth.clone(),
        })
    }

    fn token_url(&self, host_key: &str) -> Result<String, AuthError> {
        let host = self
            .hosts
            .iter()
            .find(|h| h.id == host_key)
            .ok_or_else(|| AuthError::UnknownHost(host_key.to_string()))?;
        Ok(format!("{}{}/v1/OAuth", self.scheme, host.api_url))
    }
}

#[async_trait]
impl AuthProvider for OAuthProvider {
    async fn refresh_token(&self, current: &TokenData) -> Result<TokenPair, AuthError> {
        let refresh_token = current
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingRefreshToken)?;
        let url = self.token_url(&current.host_key)?;

        debug!(host = %current.host_key, "Refreshing access token");

        let params = [
            ("grant_type", GRANT_TYPE_REFRESH_TOKEN),
            ("refresh_token", refresh_token),
            ("client_id", self.auth.client_id.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Token refresh rejected");
            return Err(AuthError::Rejected(status.as_u16()));
        }

        let body: OAuthTokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        Ok(TokenPair {
            access_token: body.access_token,
            refresh_token: body.refresh_token,
        })
    }

    fn login_request_url(&self, host_key: &str) -> Result<String, AuthError> {
        let base = self.token_url(host_key)?;
        Ok(format!(
            "{}/authorize?response_type=code&client_id={}&redirect_uri={}&{}={}",
            base,
            urlencoding::encode(&self.auth.client_id),
            urlencoding::encode(&self.auth.redirect_uri),
            HOST_PARAMETER,
            urlencoding::encode(host_key),
        ))
    }

    async fn log_out(&self, session: &SessionContext) {
        session.clear().await;
    }
}
