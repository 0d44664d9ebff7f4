use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub caching: CachingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub filing: FilingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub item: ItemConfig,
    #[serde(default)]
    pub session: Option<SessionConfig>,
}

/// Backend API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// URL scheme prepended to the host API address (e.g., "https://")
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Known backend hosts, selected by key at login
    #[serde(default = "default_hosts")]
    pub hosts: Vec<HostData>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            hosts: default_hosts(),
        }
    }
}

fn default_scheme() -> String {
    "https://".to_string()
}

fn default_hosts() -> Vec<HostData> {
    vec![
        HostData::new("prod.name.com", "prod (USA)", "product-us.domain.com"),
        HostData::new("eu.domain.com", "EU (EU/UK)", "product-eu.domain.com"),
        HostData::new("au.domain.com", "AU (Australia)", "product-au.domain.com"),
        HostData::new("lab.domain.com", "lab (USA)", "product-lab.domain.com"),
    ]
}

/// A backend host the user can sign in to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HostData {
    /// Host key stored with the session token
    pub id: String,
    /// Human readable name
    pub name: String,
    /// API address without scheme (e.g., "product-us.domain.com")
    pub api_url: String,
}

impl HostData {
    pub fn new(id: &str, name: &str, api_url: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            api_url: api_url.to_string(),
        }
    }
}

/// HTTP pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    /// URL fragments of endpoints that may be resent after a 5xx response
    #[serde(default = "default_retry_endpoints")]
    pub retry_on_error_endpoints: Vec<String>,
    /// Per-request transport timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            retry_on_error_endpoints: default_retry_endpoints(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_retry_endpoints() -> Vec<String> {
    vec!["filingLocations".to_string(), "user/cabinets".to_string()]
}

fn default_timeout() -> u32 {
    30
}

/// Cabinet list caching configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CachingConfig {
    #[serde(default = "default_true")]
    pub cabinet_caching_enabled: bool,
    /// How long a cached cabinet list stays valid
    #[serde(default = "default_cache_ttl_hours")]
    pub cabinet_cache_ttl_hours: u32,
}

impl Default for CachingConfig {
    fn default() -> Self {
        Self {
            cabinet_caching_enabled: true,
            cabinet_cache_ttl_hours: default_cache_ttl_hours(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl_hours() -> u32 {
    24
}

/// Activity log configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub client_logging_enabled: bool,
    #[serde(default = "default_client_levels")]
    pub client_allowed_levels: Vec<LogLevel>,
    #[serde(default = "default_true")]
    pub server_logging_enabled: bool,
    #[serde(default = "default_server_levels")]
    pub server_allowed_levels: Vec<LogLevel>,
    /// Application version reported with each log record
    #[serde(default = "default_version")]
    pub version: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            client_logging_enabled: true,
            client_allowed_levels: default_client_levels(),
            server_logging_enabled: true,
            server_allowed_levels: default_server_levels(),
            version: default_version(),
        }
    }
}

fn default_client_levels() -> Vec<LogLevel> {
    vec![LogLevel::Debug, LogLevel::Info, LogLevel::Warn, LogLevel::Error]
}

fn default_server_levels() -> Vec<LogLevel> {
    vec![LogLevel::Warn, LogLevel::Error]
}

fn default_version() -> String {
    "v1.1".to_string()
}

/// Activity log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Filing configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilingConfig {
    /// Compute hashed cabinet ids used by the filed-item indicator
    #[serde(default)]
    pub set_indicator: bool,
}

/// OAuth client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            redirect_uri: default_redirect_uri(),
        }
    }
}

fn default_client_id() -> String {
    "product-Mobile".to_string()
}

fn default_redirect_uri() -> String {
    "https://localhost/Pages/Index.html".to_string()
}

/// Storage backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("mailfiler.db")
}

/// Available storage backends
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

/// Mail item handling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ItemConfig {
    /// How long to wait for extended item fields before loading data anyway
    #[serde(default = "default_init_timeout")]
    pub initialization_timeout_ms: u64,
}

impl Default for ItemConfig {
    fn default() -> Self {
        Self {
            initialization_timeout_ms: default_init_timeout(),
        }
    }
}

fn default_init_timeout() -> u64 {
    2200
}

/// Pre-seeded session for headless use (CLI, tests)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    pub host_key: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub default_cabinet_id: Option<String>,
}

/// Sanitized config for display (tokens redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub api: ApiConfig,
    pub http: HttpConfig,
    pub caching: CachingConfig,
    pub logging: LoggingConfig,
    pub filing: FilingConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub item: ItemConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SanitizedSessionConfig>,
}

/// Sanitized session config (tokens hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSessionConfig {
    pub host_key: String,
    pub access_token_configured: bool,
    pub refresh_token_configured: bool,
    pub default_cabinet_id: Option<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            api: config.api.clone(),
            http: config.http.clone(),
            caching: config.caching.clone(),
            logging: config.logging.clone(),
            filing: config.filing.clone(),
            auth: config.auth.clone(),
            storage: config.storage.clone(),
            item: config.item.clone(),
            session: config.session.as_ref().map(|s| SanitizedSessionConfig {
                host_key: s.host_key.clone(),
                access_token_configured: !s.access_token.is_empty(),
                refresh_token_configured: s
                    .refresh_token
                    .as_ref()
                    .map(|t| !t.is_empty())
                    .unwrap_or(false),
                default_cabinet_id: s.default_cabinet_id.clone(),
            }),
        }
    }
}
