//! Filing task results reported by the filing backend.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilingStatus {
    Succeeded,
    Active,
    Failed,
    Cancelled,
}

/// Operation the server performed for one location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilingServerOperation {
    Upload,
    Copy,
    Profile,
    FileNia,
    FileIa,
    Unfile,
    Unprofile,
}

impl FilingServerOperation {
    /// Whether a successful operation leaves the item filed in the location.
    pub fn files_item(&self) -> bool {
        !matches!(
            self,
            FilingServerOperation::Unfile | FilingServerOperation::Unprofile
        )
    }
}

/// Server-confirmed outcome for one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileItemResult {
    pub location_id: String,
    pub operation: FilingServerOperation,
    pub status: FilingStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingTaskResponse {
    pub status: FilingStatus,
    #[serde(default)]
    pub file_item_results: Vec<FileItemResult>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingTaskType {
    /// Started by the user from this panel.
    #[default]
    Regular,
    /// Resumed tracking of a task started earlier.
    Tracking,
}

/// A completed filing task as delivered to the panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingTask {
    pub id: String,
    #[serde(default)]
    pub task_type: FilingTaskType,
    pub response: FilingTaskResponse,
}
