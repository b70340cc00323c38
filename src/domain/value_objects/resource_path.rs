//! Relative API paths for the resources this layer knows about.

pub struct ResourcePath;

impl ResourcePath {
    pub fn course(course_id: &str) -> String {
        format!("courses/{course_id}")
    }

    pub fn lesson(lesson_id: &str) -> String {
        format!("lessons/{lesson_id}")
    }

    pub fn media(asset_id: &str) -> String {
        format!("media/{asset_id}")
    }

    pub fn note(lesson_id: &str) -> String {
        format!("lessons/{lesson_id}/note")
    }

    pub fn completion(lesson_id: &str) -> String {
        format!("lessons/{lesson_id}/completion")
    }
}
