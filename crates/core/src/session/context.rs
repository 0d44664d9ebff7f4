//! Shared session state read by every outgoing request.

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::{ApiConfig, Config, HostData};

use super::SessionError;

/// Tokens and host of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenData {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Key of the [`HostData`] the user signed in to.
    pub host_key: String,
}

/// Tokens returned by a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    /// Some providers rotate the refresh token; `None` keeps the current one.
    pub refresh_token: Option<String>,
}

/// Process-wide session.
///
/// Readers take the access token when a request is built, so a refreshed token
/// is picked up by the next attempt. Tokens are only written by sign-in,
/// sign-out and the pipeline's refresh path.
#[derive(Debug)]
pub struct SessionContext {
    scheme: String,
    hosts: Vec<HostData>,
    tokens: RwLock<Option<TokenData>>,
    default_cabinet_id: RwLock<Option<String>>,
}

impl SessionContext {
    /// Create a signed-out session for the given hosts.
    pub fn new(api: &ApiConfig) -> Self {
        Self {
            scheme: api.scheme.clone(),
            hosts: api.hosts.clone(),
            tokens: RwLock::new(None),
            default_cabinet_id: RwLock::new(None),
        }
    }

    /// Create a session, pre-seeded from the `[session]` config section if present.
    pub fn from_config(config: &Config) -> Self {
        let tokens = config.session.as_ref().map(|s| TokenData {
            access_token: s.access_token.clone(),
            refresh_token: s.refresh_token.clone(),
            host_key: s.host_key.clone(),
        });
        let default_cabinet_id = config
            .session
            .as_ref()
            .and_then(|s| s.default_cabinet_id.clone());

        Self {
            scheme: config.api.scheme.clone(),
            hosts: config.api.hosts.clone(),
            tokens: RwLock::new(tokens),
            default_cabinet_id: RwLock::new(default_cabinet_id),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn hosts(&self) -> &[HostData] {
        &self.hosts
    }

    pub fn host_data(&self, host_key: &str) -> Option<&HostData> {
        self.hosts.iter().find(|h| h.id == host_key)
    }

    pub async fn sign_in(&self, tokens: TokenData) {
        info!(host = %tokens.host_key, "Signed in");
        *self.tokens.write().await = Some(tokens);
    }

    /// Drop tokens and the default cabinet.
    pub async fn clear(&self) {
        *self.tokens.write().await = None;
        *self.default_cabinet_id.write().await = None;
        debug!("Session cleared");
    }

    pub async fn is_signed_in(&self) -> bool {
        self.tokens.read().await.is_some()
    }

    pub async fn token_data(&self) -> Option<TokenData> {
        self.tokens.read().await.clone()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.tokens
            .read()
            .await
            .as_ref()
            .map(|t| t.access_token.clone())
    }

    /// Store refreshed tokens. Returns false if the session was cleared meanwhile.
    pub(crate) async fn replace_tokens(&self, pair: TokenPair) -> bool {
        let mut tokens = self.tokens.write().await;
        match tokens.as_mut() {
            Some(current) => {
                current.access_token = pair.access_token;
                if pair.refresh_token.is_some() {
                    current.refresh_token = pair.refresh_token;
                }
                true
            }
            None => false,
        }
    }

    /// `{scheme}{api_url}/v1` for the signed-in host.
    pub async fn api_base_url(&self) -> Result<String, SessionError> {
        let host_key = self
            .tokens
            .read()
            .await
            .as_ref()
            .map(|t| t.host_key.clone())
            .ok_or(SessionError::NotSignedIn)?;
        let host = self
            .host_data(&host_key)
            .ok_or(SessionError::UnknownHost(host_key))?;
        Ok(format!("{}{}/v1", self.scheme, host.api_url))
    }

    pub async fn default_cabinet_id(&self) -> Option<String> {
        self.default_cabinet_id.read().await.clone()
    }

    pub async fn set_default_cabinet_id(&self, cabinet_id: Option<String>) {
        *self.default_cabinet_id.write().await = cabinet_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;

    fn tokens(host: &str) -> TokenData {
        TokenData {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            host_key: host.to_string(),
        }
    }

    #[tokio::test]
    async fn test_base_url_requires_sign_in() {
        let session = SessionContext::new(&ApiConfig::default());
        assert!(matches!(
            session.api_base_url().await,
            Err(SessionError::NotSignedIn)
        ));
    }

    #[tokio::test]
    async fn test_base_url_resolves_host() {
        let session = SessionContext::new(&ApiConfig::default());
        session.sign_in(tokens("eu.domain.com")).await;

        assert_eq!(
            session.api_base_url().await.unwrap(),
            "https://product-eu.domain.com/v1"
        );
    }

    #[tokio::test]
    async fn test_unknown_host() {
        let session = SessionContext::new(&ApiConfig::default());
        session.sign_in(tokens("nowhere")).await;

        match session.api_base_url().await {
            Err(SessionError::UnknownHost(key)) => assert_eq!(key, "nowhere"),
            other => panic!("expected UnknownHost, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_replace_tokens_keeps_refresh_token_when_not_rotated() {
        let session = SessionContext::new(&ApiConfig::default());
        session.sign_in(tokens("prod.name.com")).await;

        let replaced = session
            .replace_tokens(TokenPair {
                access_token: "new".to_string(),
                refresh_token: None,
            })
            .await;

        assert!(replaced);
        let data = session.token_data().await.unwrap();
        assert_eq!(data.access_token, "new");
        assert_eq!(data.refresh_token.as_deref(), Some("refresh"));
    }

    #[tokio::test]
    async fn test_replace_tokens_after_clear_is_ignored() {
        let session = SessionContext::new(&ApiConfig::default());
        let replaced = session
            .replace_tokens(TokenPair {
                access_token: "new".to_string(),
                refresh_token: None,
            })
            .await;

        assert!(!replaced);
        assert!(!session.is_signed_in().await);
    }

    #[tokio::test]
    async fn test_from_config_seeds_session() {
        let config = Config {
            session: Some(SessionConfig {
                host_key: "au.domain.com".to_string(),
                access_token: "seeded".to_string(),
                refresh_token: None,
                default_cabinet_id: Some("CAB-7".to_string()),
            }),
            ..Default::default()
        };

        let session = SessionContext::from_config(&config);
        assert_eq!(session.access_token().await.as_deref(), Some("seeded"));
        assert_eq!(session.default_cabinet_id().await.as_deref(), Some("CAB-7"));

        session.clear().await;
        assert!(session.access_token().await.is_none());
        assert!(session.default_cabinet_id().await.is_none());
    }
}
