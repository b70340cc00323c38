use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Course,
    Lesson,
    NoteDraft,
    MediaAsset,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Course => "course",
            ResourceKind::Lesson => "lesson",
            ResourceKind::NoteDraft => "note_draft",
            ResourceKind::MediaAsset => "media_asset",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            "course" => Ok(ResourceKind::Course),
            "lesson" => Ok(ResourceKind::Lesson),
            "note_draft" => Ok(ResourceKind::NoteDraft),
            "media_asset" => Ok(ResourceKind::MediaAsset),
            other => Err(format!("Unknown resource kind: {other}")),
        }
    }

    /// Infers the kind from a relative or absolute resource address.
    pub fn infer(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path
            .trim_end_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        match segments.last() {
            Some(&"note") | Some(&"notes") | Some(&"completion") => {
                return ResourceKind::NoteDraft;
            }
            _ => {}
        }

        if segments.iter().any(|s| *s == "media" || *s == "assets") {
            ResourceKind::MediaAsset
        } else if segments.iter().any(|s| *s == "lessons") {
            ResourceKind::Lesson
        } else {
            ResourceKind::Course
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_kind_from_path() {
        assert_eq!(ResourceKind::infer("courses/c1"), ResourceKind::Course);
        assert_eq!(
            ResourceKind::infer("https://lms.example.com/api/lessons/l1"),
            ResourceKind::Lesson
        );
        assert_eq!(ResourceKind::infer("lessons/l1/note"), ResourceKind::NoteDraft);
        assert_eq!(
            ResourceKind::infer("lessons/l1/completion?x=1"),
            ResourceKind::NoteDraft
        );
        assert_eq!(ResourceKind::infer("media/m1"), ResourceKind::MediaAsset);
        assert_eq!(ResourceKind::infer("catalog"), ResourceKind::Course);
    }

    #[test]
    fn parse_matches_as_str() {
        for kind in [
            ResourceKind::Course,
            ResourceKind::Lesson,
            ResourceKind::NoteDraft,
            ResourceKind::MediaAsset,
        ] {
            assert_eq!(ResourceKind::parse(kind.as_str()), Ok(kind));
        }
        assert!(ResourceKind::parse("video").is_err());
    }
}
