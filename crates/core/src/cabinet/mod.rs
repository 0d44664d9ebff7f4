//! User cabinets: loading, caching and the current selection.

mod data;

pub use data::{CabinetData, NO_CABINET_ID, NO_CABINET_NAME};

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha512};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::{CachingConfig, Config};
use crate::http::{endpoints, HttpPipeline, RequestOutcome, RequestResult};
use crate::storage::{Storage, StorageType};

pub const CABINET_CACHE_KEY: &str = "cabinet_cache";
pub const DEFAULT_CABINET_KEY: &str = "default_cabinet_id";

/// A cabinet the user can file into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cabinet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub contains_workspaces: bool,
    #[serde(default)]
    pub repository_id: Option<String>,
    /// SHA-512 of the upper-cased id, set when filed-item indicators are enabled.
    #[serde(default)]
    pub hash_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CabinetsResponse {
    #[serde(default)]
    repositories: Option<Vec<Repository>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Repository {
    #[serde(default)]
    repository_id: Option<String>,
    #[serde(default)]
    cabinets: Option<Vec<CabinetEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CabinetEntry {
    cabinet_id: String,
    #[serde(default)]
    cabinet_name: String,
    #[serde(default)]
    default_cabinet: bool,
    #[serde(default)]
    contains_workspaces: bool,
}

pub struct CabinetService {
    pipeline: Arc<HttpPipeline>,
    storage: Arc<dyn Storage>,
    caching: CachingConfig,
    set_indicator: bool,
    current: RwLock<Vec<Cabinet>>,
}

impl CabinetService {
    pub fn new(
        pipeline: Arc<HttpPipeline>,
        storage: Arc<dyn Storage>,
        caching: CachingConfig,
        set_indicator: bool,
    ) -> Self {
        Self {
            pipeline,
            storage,
            caching,
            set_indicator,
            current: RwLock::new(Vec::new()),
        }
    }

    pub fn from_config(pipeline: Arc<HttpPipeline>, storage: Arc<dyn Storage>, config: &Config) -> Self {
        Self::new(
            pipeline,
            storage,
            config.caching.clone(),
            config.filing.set_indicator,
        )
    }

    /// Load the cabinet list, from the cache when it is fresh.
    ///
    /// A successful result carries the flattened, sorted list as its body.
    pub async fn load_cabinets(&self) -> RequestOutcome {
        if self.caching.cabinet_caching_enabled {
            if let Some(cabinets) = self.cached_cabinets() {
                debug!(count = cabinets.len(), "Serving cabinets from cache");
                let body = cabinets_value(&cabinets);
                *self.current.write().await = cabinets;
                return RequestOutcome::Completed(RequestResult::cached(endpoints::USER_CABINETS, body));
            }
        }

        let mut result = match self.pipeline.get(endpoints::USER_CABINETS, None).await {
            RequestOutcome::Completed(result) => result,
            RequestOutcome::Cancelled => return RequestOutcome::Cancelled,
        };
        if !result.is_successful() {
            return RequestOutcome::Completed(result);
        }

        let response: CabinetsResponse = match result.parse_body() {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Unexpected cabinets response");
                return RequestOutcome::Completed(result);
            }
        };
        let Some(repositories) = response.repositories else {
            return RequestOutcome::Completed(result);
        };

        let cabinets = flatten_cabinets(repositories, self.set_indicator);
        let body = cabinets_value(&cabinets);
        result.set_body(body.clone());

        if self.caching.cabinet_caching_enabled && !cabinets.is_empty() {
            if let Err(e) = self.storage.set_item(StorageType::Database, CABINET_CACHE_KEY, body) {
                warn!(error = %e, "Failed to cache cabinets");
            }
        }
        debug!(count = cabinets.len(), "Loaded cabinets");
        *self.current.write().await = cabinets;

        RequestOutcome::Completed(result)
    }

    /// The user's default cabinet if it is in the last loaded list.
    pub async fn current_cabinet_id(&self) -> Option<String> {
        let default_id = self.pipeline.session().default_cabinet_id().await?;
        self.current
            .read()
            .await
            .iter()
            .any(|c| c.id == default_id)
            .then_some(default_id)
    }

    /// Remember `cabinet_id` as the user's default, in the session and in mailbox storage.
    pub async fn set_user_default_cabinet_id(&self, cabinet_id: &str) {
        self.pipeline
            .session()
            .set_default_cabinet_id(Some(cabinet_id.to_string()))
            .await;
        match self.storage.set_item(
            StorageType::Mailbox,
            DEFAULT_CABINET_KEY,
            Value::String(cabinet_id.to_string()),
        ) {
            Ok(()) => debug!(cabinet = cabinet_id, "Saved default cabinet"),
            Err(e) => warn!(cabinet = cabinet_id, error = %e, "Failed to save default cabinet"),
        }
    }

    /// Restore the saved default cabinet into the session unless one is already set.
    pub async fn restore_user_default_cabinet_id(&self) {
        let session = self.pipeline.session();
        if session.default_cabinet_id().await.is_some() {
            return;
        }
        match self.storage.get_item(StorageType::Mailbox, DEFAULT_CABINET_KEY) {
            Ok(Some(item)) => {
                if let Value::String(id) = item.value {
                    session.set_default_cabinet_id(Some(id)).await;
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to read default cabinet"),
        }
    }

    pub fn clear_cache(&self) {
        if !self.caching.cabinet_caching_enabled {
            return;
        }
        if let Err(e) = self.storage.remove_item(StorageType::Database, CABINET_CACHE_KEY) {
            warn!(error = %e, "Failed to clear cabinet cache");
        }
    }

    fn cached_cabinets(&self) -> Option<Vec<Cabinet>> {
        let item = match self.storage.get_item(StorageType::Database, CABINET_CACHE_KEY) {
            Ok(item) => item?,
            Err(e) => {
                warn!(error = %e, "Failed to read cabinet cache");
                return None;
            }
        };

        let ttl = Duration::hours(i64::from(self.caching.cabinet_cache_ttl_hours));
        if item.creation_date + ttl <= Utc::now() {
            debug!(created = %item.creation_date, "Cabinet cache expired");
            return None;
        }

        match serde_json::from_value(item.value) {
            Ok(cabinets) => Some(cabinets),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable cabinet cache");
                None
            }
        }
    }
}

/// Flatten repositories into one list: default cabinet first, then by name.
fn flatten_cabinets(repositories: Vec<Repository>, set_indicator: bool) -> Vec<Cabinet> {
    let mut cabinets: Vec<Cabinet> = repositories
        .into_iter()
        .flat_map(|repository| {
            let repository_id = repository.repository_id;
            repository
                .cabinets
                .unwrap_or_default()
                .into_iter()
                .map(move |entry| Cabinet {
                    hash_id: set_indicator.then(|| hash_cabinet_id(&entry.cabinet_id)),
                    id: entry.cabinet_id,
                    name: entry.cabinet_name,
                    is_default: entry.default_cabinet,
                    contains_workspaces: entry.contains_workspaces,
                    repository_id: repository_id.clone(),
                })
        })
        .collect();

    cabinets.sort_by(|a, b| {
        b.is_default
            .cmp(&a.is_default)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    cabinets
}

pub fn hash_cabinet_id(cabinet_id: &str) -> String {
    format!("{:x}", Sha512::digest(cabinet_id.to_uppercase().as_bytes()))
}

fn cabinets_value(cabinets: &[Cabinet]) -> Value {
    serde_json::to_value(cabinets).unwrap_or(Value::Array(Vec::new()))
}
