use crate::domain::value_objects::{CacheKey, ResourcePath};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncedResourceKind {
    Note,
    Completion,
}

impl SyncedResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncedResourceKind::Note => "note",
            SyncedResourceKind::Completion => "completion",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            "note" => Ok(SyncedResourceKind::Note),
            "completion" => Ok(SyncedResourceKind::Completion),
            other => Err(format!("Unknown synced resource kind: {other}")),
        }
    }
}

/// A user-authored record that can be edited offline: a lesson note or a completion marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedResource {
    pub kind: SyncedResourceKind,
    pub lesson_id: String,
}

impl SyncedResource {
    pub fn new(kind: SyncedResourceKind, lesson_id: impl Into<String>) -> Result<Self, String> {
        let lesson_id = lesson_id.into();
        if lesson_id.trim().is_empty() {
            return Err("Lesson id cannot be empty".to_string());
        }
        Ok(Self { kind, lesson_id })
    }

    pub fn note(lesson_id: impl Into<String>) -> Result<Self, String> {
        Self::new(SyncedResourceKind::Note, lesson_id)
    }

    pub fn completion(lesson_id: impl Into<String>) -> Result<Self, String> {
        Self::new(SyncedResourceKind::Completion, lesson_id)
    }

    /// Relative API path used for both the read and the write.
    pub fn path(&self) -> String {
        match self.kind {
            SyncedResourceKind::Note => ResourcePath::note(&self.lesson_id),
            SyncedResourceKind::Completion => ResourcePath::completion(&self.lesson_id),
        }
    }

    pub fn local_key(&self) -> Result<CacheKey, String> {
        CacheKey::local(&self.path())
    }
}

impl fmt::Display for SyncedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.lesson_id)
    }
}
