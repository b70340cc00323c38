use crate::application::ports::blob_store::BlobStore;
use crate::application::services::request_gateway::RequestGateway;
use crate::domain::entities::{
    AssetStatus, CourseManifest, DownloadStatus, DownloadTask, LessonContent,
};
use crate::domain::value_objects::{CacheKey, ResourceKind, ResourcePath};
use crate::shared::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Shared view of one course download. Clones observe the same task.
#[derive(Clone)]
pub struct DownloadHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    id: Uuid,
    course_id: String,
    state: watch::Sender<DownloadTask>,
    cancel: CancellationToken,
}

impl DownloadHandle {
    fn new(course_id: &str) -> Self {
        let mut task = DownloadTask::new(course_id);
        task.status = DownloadStatus::Downloading;
        let (state, _) = watch::channel(task);

        Self {
            inner: Arc::new(HandleInner {
                id: Uuid::new_v4(),
                course_id: course_id.to_string(),
                state,
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn course_id(&self) -> &str {
        &self.inner.course_id
    }

    pub fn snapshot(&self) -> DownloadTask {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DownloadTask> {
        self.inner.state.subscribe()
    }

    pub fn same_task(&self, other: &DownloadHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Resolves once the task reaches `complete`, `failed` or `cancelled`.
    pub async fn wait(&self) -> DownloadTask {
        let mut rx = self.subscribe();
        loop {
            {
                let task = rx.borrow_and_update();
                if task.is_terminal() {
                    return task.clone();
                }
            }
            if rx.changed().await.is_err() {
                return self.snapshot();
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut DownloadTask),
    {
        self.inner.state.send_modify(f);
    }
}

/// Pins whole courses (metadata, lessons, media) into the blob store for offline use.
///
/// Lessons of one course are processed strictly one after another. Anything already in the
/// store is not fetched again, so re-running a download resumes it.
pub struct DownloadManager {
    gateway: Arc<RequestGateway>,
    store: Arc<dyn BlobStore>,
    tasks: Mutex<HashMap<String, DownloadHandle>>,
}

impl DownloadManager {
    pub fn new(gateway: Arc<RequestGateway>, store: Arc<dyn BlobStore>) -> Self {
        Self {
            gateway,
            store,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Starts pinning `course_id`, or returns the handle of the download already running for it.
    pub async fn start_download(
        self: &Arc<Self>,
        course_id: &str,
    ) -> Result<DownloadHandle, AppError> {
        if course_id.trim().is_empty() {
            return Err(AppError::InvalidInput("Course id cannot be empty".into()));
        }

        let mut tasks = self.tasks.lock().await;
        if let Some(existing) = tasks.get(course_id) {
            if existing.snapshot().status == DownloadStatus::Downloading {
                debug!("Download for course {} already running", course_id);
                return Ok(existing.clone());
            }
        }

        let handle = DownloadHandle::new(course_id);
        tasks.insert(course_id.to_string(), handle.clone());
        drop(tasks);

        info!(course_id, task_id = %handle.id(), "starting course download");
        tokio::spawn(Arc::clone(self).run(handle.clone()));

        Ok(handle)
    }

    /// Stops scheduling further lessons. The lesson in flight still completes and is kept.
    pub async fn cancel(&self, course_id: &str) -> bool {
        let tasks = self.tasks.lock().await;
        let Some(handle) = tasks.get(course_id) else {
            return false;
        };
        if handle.snapshot().status != DownloadStatus::Downloading {
            return false;
        }

        handle.inner.cancel.cancel();
        handle.update(|task| task.status = DownloadStatus::Cancelled);
        info!(course_id, "course download cancelled");
        true
    }

    pub async fn progress(&self, course_id: &str) -> Option<DownloadTask> {
        self.tasks
            .lock()
            .await
            .get(course_id)
            .map(DownloadHandle::snapshot)
    }

    /// True when the course metadata, every lesson and every referenced media asset are stored.
    /// Always checks the store, since entries can be cleared after a task completed.
    pub async fn is_downloaded(&self, course_id: &str) -> Result<bool, AppError> {
        if let Some(task) = self.progress(course_id).await {
            if task.status == DownloadStatus::Downloading {
                return Ok(false);
            }
        }

        let Some(manifest) = self.stored_manifest(course_id).await? else {
            return Ok(false);
        };

        for lesson_id in manifest.lesson_ids() {
            let key = self.gateway.cache_key_for(&ResourcePath::lesson(&lesson_id))?;
            let Some(entry) = self.store.get(&key).await? else {
                return Ok(false);
            };
            let Ok(lesson) = serde_json::from_slice::<LessonContent>(&entry.payload) else {
                return Ok(false);
            };
            for media in &lesson.media {
                let key = self.gateway.cache_key_for(&media.fetch_path())?;
                if !self.store.contains(&key).await? {
                    return Ok(false);
                }
            }
        }

        Ok(true)
    }

    /// Deletes everything stored for the course and forgets its task. Per-entry failures are logged.
    pub async fn remove_course(&self, course_id: &str) -> Result<u64, AppError> {
        self.cancel(course_id).await;
        self.tasks.lock().await.remove(course_id);
        // A pending background mirror write would otherwise recreate an entry after deletion.
        self.gateway.flush_cache_writes().await;

        let manifest_key = self.gateway.cache_key_for(&ResourcePath::course(course_id))?;
        let mut keys = Vec::new();

        if let Some(manifest) = self.stored_manifest(course_id).await? {
            for lesson_id in manifest.lesson_ids() {
                let lesson_key = self.gateway.cache_key_for(&ResourcePath::lesson(&lesson_id))?;
                if let Some(entry) = self.store.get(&lesson_key).await? {
                    if let Ok(lesson) = serde_json::from_slice::<LessonContent>(&entry.payload) {
                        for media in &lesson.media {
                            keys.push(self.gateway.cache_key_for(&media.fetch_path())?);
                        }
                    }
                }
                keys.push(lesson_key);
            }
        }
        keys.push(manifest_key);

        let mut removed = 0;
        for key in keys {
            match self.store.delete(&key).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(err) => warn!("Failed to remove {} for course {}: {}", key, course_id, err),
            }
        }

        info!(course_id, removed, "removed downloaded course");
        Ok(removed)
    }

    /// Cancels every running download.
    pub async fn cancel_all(&self) {
        let course_ids: Vec<String> = self.tasks.lock().await.keys().cloned().collect();
        for course_id in course_ids {
            self.cancel(&course_id).await;
        }
    }

    async fn run(self: Arc<Self>, handle: DownloadHandle) {
        let course_id = handle.course_id().to_string();

        let manifest = match self.load_manifest(&course_id).await {
            Ok(manifest) => manifest,
            Err(err) => {
                warn!("Failed to fetch metadata for course {}: {}", course_id, err);
                handle.update(|task| {
                    task.total_units = 1;
                    if task.status == DownloadStatus::Downloading {
                        task.status = DownloadStatus::Failed;
                    }
                });
                return;
            }
        };

        let lesson_ids = manifest.lesson_ids();
        handle.update(|task| {
            task.total_units = 1 + lesson_ids.len() as u32;
            task.completed_units = 1;
            for lesson_id in &lesson_ids {
                task.per_asset_status
                    .insert(lesson_id.clone(), AssetStatus::Pending);
            }
        });

        for lesson_id in &lesson_ids {
            if handle.is_cancelled() {
                debug!(course_id = %course_id, "not scheduling further lessons");
                break;
            }

            let stored = self.download_lesson(&handle, lesson_id).await;
            handle.update(|task| {
                if stored {
                    task.per_asset_status
                        .insert(lesson_id.clone(), AssetStatus::Done);
                    task.complete_unit();
                } else {
                    task.per_asset_status
                        .insert(lesson_id.clone(), AssetStatus::Failed);
                }
            });
        }

        handle.update(|task| {
            if task.status != DownloadStatus::Downloading {
                return;
            }
            let all_done = task
                .per_asset_status
                .values()
                .all(|status| *status == AssetStatus::Done);
            task.status = if all_done {
                DownloadStatus::Complete
            } else {
                DownloadStatus::Failed
            };
        });

        let task = handle.snapshot();
        info!(
            course_id = %course_id,
            status = ?task.status,
            completed = task.completed_units,
            total = task.total_units,
            "course download finished"
        );
    }

    async fn load_manifest(&self, course_id: &str) -> Result<CourseManifest, AppError> {
        let bytes = self
            .fetch_pinned(&ResourcePath::course(course_id), ResourceKind::Course)
            .await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| AppError::DeserializationError(format!("Invalid course metadata: {e}")))
    }

    /// Returns whether the lesson content and all of its media are now stored.
    async fn download_lesson(&self, handle: &DownloadHandle, lesson_id: &str) -> bool {
        let lesson = match self
            .fetch_pinned(&ResourcePath::lesson(lesson_id), ResourceKind::Lesson)
            .await
            .and_then(|bytes| {
                serde_json::from_slice::<LessonContent>(&bytes).map_err(|e| {
                    AppError::DeserializationError(format!("Invalid lesson {lesson_id}: {e}"))
                })
            }) {
            Ok(lesson) => lesson,
            Err(err) => {
                warn!("Failed to download lesson {}: {}", lesson_id, err);
                return false;
            }
        };

        let mut complete = true;
        for media in &lesson.media {
            let status = match self.ensure_media(&media.fetch_path()).await {
                Ok(()) => AssetStatus::Done,
                Err(err) => {
                    warn!(
                        "Failed to download media {} for lesson {}: {}",
                        media.id, lesson_id, err
                    );
                    complete = false;
                    AssetStatus::Failed
                }
            };
            handle.update(|task| {
                task.per_asset_status.insert(media.id.clone(), status);
            });
        }

        complete
    }

    /// Returns the stored payload for `path`, fetching and pinning it first when absent.
    async fn fetch_pinned(&self, path: &str, kind: ResourceKind) -> Result<Vec<u8>, AppError> {
        let key = self.gateway.cache_key_for(path)?;

        if self.store.pin(&key).await? {
            if let Some(entry) = self.store.get(&key).await? {
                debug!("{} already stored; skipping fetch", key);
                return Ok(entry.payload);
            }
        }

        let response = self.gateway.get(path).await?.error_for_status()?;
        self.store.put_pinned(&key, &response.body, kind).await?;
        Ok(response.body)
    }

    async fn ensure_media(&self, path: &str) -> Result<(), AppError> {
        let key = self.gateway.cache_key_for(path)?;
        if self.store.pin(&key).await? {
            debug!("{} already stored; skipping fetch", key);
            return Ok(());
        }

        let response = self.gateway.get(path).await?.error_for_status()?;
        self.store
            .put_pinned(&key, &response.body, ResourceKind::MediaAsset)
            .await
    }

    async fn stored_manifest(&self, course_id: &str) -> Result<Option<CourseManifest>, AppError> {
        let key: CacheKey = self.gateway.cache_key_for(&ResourcePath::course(course_id))?;
        let Some(entry) = self.store.get(&key).await? else {
            return Ok(None);
        };
        Ok(serde_json::from_slice(&entry.payload).ok())
    }
}
