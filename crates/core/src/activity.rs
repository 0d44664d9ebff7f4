//! User activity log.
//!
//! Records go to the local `tracing` subscriber and, when enabled, to the
//! server's client logging endpoint. Logging never fails into the caller.
//! Server records are sent in the background; [`ActivityLog::flush`] waits
//! for the ones already handed off.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::config::{LogLevel, LoggingConfig};
use crate::http::{endpoints, HttpPipeline, RequestOutcome};

pub const APP_ID: &str = "product-Mobile";
const NO_VALUE: &str = "No value";

/// One activity record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogInfo {
    pub app_id: String,
    pub office_host: String,
    pub platform: String,
    pub log_level: LogLevel,
    pub action: String,
    /// SHA-256 of the user id.
    pub user: String,
    pub creation_date: DateTime<Utc>,
    pub data: Value,
}

impl LogInfo {
    /// Flatten into the `{clientLoggingFields: [{key, value}]}` server payload.
    ///
    /// String values are sent as is, everything else as JSON text.
    pub fn to_server_payload(&self) -> Value {
        let fields: Vec<Value> = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map
                .into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    serde_json::json!({ "key": key, "value": value })
                })
                .collect(),
            _ => Vec::new(),
        };
        serde_json::json!({ "clientLoggingFields": fields })
    }
}

/// Where the client runs, reported with each record.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub user_id: String,
    pub host: String,
    pub platform: String,
}

pub struct ActivityLog {
    config: LoggingConfig,
    client: ClientInfo,
    user_hash: String,
    pipeline: Option<Arc<HttpPipeline>>,
    tasks: TaskTracker,
}

impl ActivityLog {
    /// Log locally only.
    pub fn new(config: LoggingConfig, client: ClientInfo) -> Self {
        let user_hash = format!("{:x}", Sha256::digest(client.user_id.as_bytes()));
        Self {
            config,
            client,
            user_hash,
            pipeline: None,
            tasks: TaskTracker::new(),
        }
    }

    /// Also ship records to the server through `pipeline`.
    pub fn with_pipeline(mut self, pipeline: Arc<HttpPipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Wait until every server record logged so far has been sent or failed.
    pub async fn flush(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    pub fn debug(&self, action: &str, data: Option<Value>) {
        self.log(LogLevel::Debug, action, data);
    }

    pub fn info(&self, action: &str, data: Option<Value>) {
        self.log(LogLevel::Info, action, data);
    }

    pub fn warn(&self, action: &str, data: Option<Value>) {
        self.log(LogLevel::Warn, action, data);
    }

    pub fn error(&self, action: &str, data: Option<Value>) {
        self.log(LogLevel::Error, action, data);
    }

    pub fn record(&self, level: LogLevel, action: &str, data: Option<Value>) -> LogInfo {
        LogInfo {
            app_id: format!("{} {}", APP_ID, self.config.version),
            office_host: self.client.host.clone(),
            platform: self.client.platform.clone(),
            log_level: level,
            action: action.to_string(),
            user: self.user_hash.clone(),
            creation_date: Utc::now(),
            data: data.unwrap_or_else(|| Value::String(NO_VALUE.to_string())),
        }
    }

    fn log(&self, level: LogLevel, action: &str, data: Option<Value>) {
        let record = self.record(level, action, data);
        if self.client_allows(level) {
            log_to_client(&record);
        }
        if self.server_allows(level) {
            self.log_to_server(record);
        }
    }

    fn client_allows(&self, level: LogLevel) -> bool {
        self.config.client_logging_enabled && self.config.client_allowed_levels.contains(&level)
    }

    fn server_allows(&self, level: LogLevel) -> bool {
        self.config.server_logging_enabled && self.config.server_allowed_levels.contains(&level)
    }

    fn log_to_server(&self, record: LogInfo) {
        let Some(pipeline) = self.pipeline.clone() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(action = %record.action, "No runtime, skipping server log");
            return;
        };

        let task = async move {
            if !pipeline.session().is_signed_in().await {
                return;
            }
            let payload = record.to_server_payload();
            match pipeline.post(endpoints::CLIENT_LOGGING, &payload, None).await {
                RequestOutcome::Completed(result) if !(200..300).contains(&result.status_code()) => {
                    warn!(
                        action = "activity -> log_to_server",
                        status = result.status_code(),
                        "Failed to ship activity record"
                    );
                }
                _ => {}
            }
        };
        self.tasks.spawn_on(task, &runtime);
    }
}

fn log_to_client(record: &LogInfo) {
    let action = record.action.as_str();
    let data = &record.data;
    match record.log_level {
        LogLevel::Debug => debug!(action = action, data = %data, "activity"),
        LogLevel::Info => info!(action = action, data = %data, "activity"),
        LogLevel::Warn => warn!(action = action, data = %data, "activity"),
        LogLevel::Error => error!(action = action, data = %data, "activity"),
    }
}
