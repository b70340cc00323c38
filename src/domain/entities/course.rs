use crate::domain::value_objects::ResourcePath;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Course metadata as returned by `GET courses/{id}`: modules with lesson stubs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseManifest {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub modules: Vec<CourseModule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseModule {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub lessons: Vec<LessonStub>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonStub {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl CourseManifest {
    /// Lesson ids in module order; a lesson listed twice is only returned once.
    pub fn lesson_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.modules
            .iter()
            .flat_map(|module| module.lessons.iter())
            .filter(|lesson| seen.insert(lesson.id.clone()))
            .map(|lesson| lesson.id.clone())
            .collect()
    }
}

/// Full lesson body as returned by `GET lessons/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonContent {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "mediaAssets", alias = "media_assets")]
    pub media: Vec<MediaRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub id: String,
    /// Explicit fetch path; defaults to `media/{id}`.
    #[serde(default)]
    pub path: Option<String>,
}

impl MediaRef {
    pub fn fetch_path(&self) -> String {
        self.path
            .clone()
            .unwrap_or_else(|| ResourcePath::media(&self.id))
    }
}
