use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Idle,
    Downloading,
    Complete,
    Failed,
    Cancelled,
}

impl DownloadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DownloadStatus::Complete | DownloadStatus::Failed | DownloadStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Pending,
    Done,
    Failed,
}

/// Progress of pinning one course for offline use.
///
/// `per_asset_status` is keyed by lesson id and by media asset id. A lesson counts as one
/// unit and only completes once its content and every media asset it references are stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadTask {
    pub course_id: String,
    pub status: DownloadStatus,
    pub completed_units: u32,
    pub total_units: u32,
    pub per_asset_status: BTreeMap<String, AssetStatus>,
}

impl DownloadTask {
    pub fn new(course_id: impl Into<String>) -> Self {
        Self {
            course_id: course_id.into(),
            status: DownloadStatus::Idle,
            completed_units: 0,
            total_units: 0,
            per_asset_status: BTreeMap::new(),
        }
    }

    pub fn fraction(&self) -> f64 {
        if self.total_units == 0 {
            return 0.0;
        }
        f64::from(self.completed_units) / f64::from(self.total_units)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Lessons and assets that are not stored yet; what a "retry missing items" action re-fetches.
    pub fn missing(&self) -> Vec<String> {
        self.per_asset_status
            .iter()
            .filter(|(_, status)| **status != AssetStatus::Done)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn complete_unit(&mut self) {
        self.completed_units = (self.completed_units + 1).min(self.total_units);
    }
}
