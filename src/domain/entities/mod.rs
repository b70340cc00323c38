pub mod cache_entry;
pub mod course;
pub mod download_task;
pub mod note_record;
pub mod outbox_entry;

pub use cache_entry::{CacheEntry, CacheStats};
pub use course::{CourseManifest, CourseModule, LessonContent, LessonStub, MediaRef};
pub use download_task::{AssetStatus, DownloadStatus, DownloadTask};
pub use note_record::{NoteRecord, RemoteNote};
pub use outbox_entry::OutboxEntry;
