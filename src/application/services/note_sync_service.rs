use crate::application::ports::blob_store::BlobStore;
use crate::application::ports::http_transport::HttpMethod;
use crate::application::ports::network_probe::NetworkProbe;
use crate::application::ports::outbox_store::OutboxStore;
use crate::application::services::request_gateway::{RequestGateway, RequestOptions};
use crate::domain::entities::{NoteRecord, RemoteNote};
use crate::domain::value_objects::{CacheKey, ResourceKind, SyncState, SyncedResource};
use crate::shared::error::AppError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Result of a `save`: the local record as it now stands, plus the write-through failure if
/// the edit did not reach the server. The edit is durably queued either way.
#[derive(Debug)]
pub struct SaveOutcome {
    pub record: NoteRecord,
    pub write_error: Option<AppError>,
}

impl SaveOutcome {
    pub fn is_synced(&self) -> bool {
        !self.record.sync_status.is_pending()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    pub pushed: u32,
    pub failed: u32,
    pub dropped: u32,
    pub remaining: u64,
}

/// Keeps user-authored records (notes, completion markers) usable offline.
///
/// The local copy is written before any network call. Edits that cannot reach the server stay
/// `pending_local` and sit in the outbox until a later `load`, `save` or outbox drain pushes them.
/// Conflicts are last-write-wins in both directions.
pub struct NoteSyncService {
    gateway: Arc<RequestGateway>,
    store: Arc<dyn BlobStore>,
    outbox: Arc<dyn OutboxStore>,
    probe: Arc<dyn NetworkProbe>,
    max_attempts: u32,
    in_flight: RwLock<HashSet<SyncedResource>>,
    local_writes: Mutex<()>,
    draining: Mutex<()>,
}

impl NoteSyncService {
    pub fn new(
        gateway: Arc<RequestGateway>,
        store: Arc<dyn BlobStore>,
        outbox: Arc<dyn OutboxStore>,
        probe: Arc<dyn NetworkProbe>,
        max_attempts: u32,
    ) -> Self {
        Self {
            gateway,
            store,
            outbox,
            probe,
            max_attempts: max_attempts.max(1),
            in_flight: RwLock::new(HashSet::new()),
            local_writes: Mutex::new(()),
            draining: Mutex::new(()),
        }
    }

    pub async fn load(&self, resource: &SyncedResource) -> Result<Option<NoteRecord>, AppError> {
        let local = self.read_local(resource).await?;

        if !self.probe.current_state().await.is_online() {
            debug!("Offline; serving local copy of {}", resource);
            return Ok(local);
        }

        if let Some(record) = local.as_ref().filter(|r| r.sync_status.is_pending()) {
            return match self.push(resource, &record.content).await {
                Ok(()) => self.read_local(resource).await,
                Err(err) => {
                    debug!("Pending edit of {} still unsynced: {}", resource, err);
                    Ok(local)
                }
            };
        }

        let response = match self.gateway.get(&resource.path()).await {
            Ok(response) if response.from_cache => {
                debug!("Network read of {} failed; serving local copy", resource);
                return Ok(local);
            }
            Ok(response) => response,
            Err(err) => {
                warn!("Failed to read {} from server: {}", resource, err);
                return Ok(local);
            }
        };

        let remote = match response.error_for_status().and_then(|r| r.json::<RemoteNote>()) {
            Ok(remote) => remote,
            Err(AppError::NotFound(_)) => return Ok(local),
            Err(err) => {
                warn!("Unusable server copy of {}: {}", resource, err);
                return Ok(local);
            }
        };

        self.accept_server_copy(resource, remote.content).await
    }

    /// Records the edit locally, then awaits the write-through when online. That await is bounded
    /// by the transport timeout; callers that must not wait on the network use
    /// `save_in_background`.
    pub async fn save(
        &self,
        resource: &SyncedResource,
        content: impl Into<String>,
    ) -> Result<SaveOutcome, AppError> {
        let content = content.into();
        let record = self.record_locally(resource, &content).await?;

        if !self.probe.current_state().await.is_online() {
            debug!("Offline; {} queued for sync", resource);
            return Ok(SaveOutcome {
                record,
                write_error: Some(AppError::Transport("Network is offline".into())),
            });
        }

        match self.push(resource, &content).await {
            Ok(()) => {
                let record = self.read_local(resource).await?.unwrap_or(record);
                Ok(SaveOutcome {
                    record,
                    write_error: None,
                })
            }
            Err(err) => {
                warn!("Write-through of {} failed; left pending: {}", resource, err);
                Ok(SaveOutcome {
                    record,
                    write_error: Some(err),
                })
            }
        }
    }

    /// Records the edit locally and returns the `pending_local` record without waiting on the
    /// network. When online the write-through runs on a spawned task; failures stay queued.
    pub async fn save_in_background(
        self: &Arc<Self>,
        resource: &SyncedResource,
        content: impl Into<String>,
    ) -> Result<NoteRecord, AppError> {
        let content = content.into();
        let record = self.record_locally(resource, &content).await?;

        if self.probe.current_state().await.is_online() {
            let service = Arc::clone(self);
            let resource = resource.clone();
            tokio::spawn(async move {
                if let Err(err) = service.push(&resource, &content).await {
                    warn!(
                        "Background write-through of {} failed; left pending: {}",
                        resource, err
                    );
                }
            });
        } else {
            debug!("Offline; {} queued for sync", resource);
        }

        Ok(record)
    }

    pub async fn sync_state(&self, resource: &SyncedResource) -> Result<SyncState, AppError> {
        if self.in_flight.read().await.contains(resource) {
            return Ok(SyncState::Syncing);
        }
        Ok(self
            .read_local(resource)
            .await?
            .map(|record| SyncState::from(record.sync_status))
            .unwrap_or(SyncState::Unsynced))
    }

    pub async fn pending_count(&self) -> Result<u64, AppError> {
        self.outbox.count().await
    }

    /// Pushes queued edits in enqueue order. Stops at the first transport failure; entries the
    /// server keeps rejecting are dropped after `max_attempts`.
    pub async fn drain_outbox(&self) -> Result<DrainReport, AppError> {
        let _guard = self.draining.lock().await;
        let mut report = DrainReport::default();

        if !self.probe.current_state().await.is_online() {
            report.remaining = self.outbox.count().await?;
            return Ok(report);
        }

        for entry in self.outbox.list(None).await? {
            match self.push(&entry.resource, &entry.content).await {
                Ok(()) => report.pushed += 1,
                Err(err) if err.is_transport() || err.is_unauthorized() => {
                    debug!("Outbox drain interrupted at {}: {}", entry.resource, err);
                    report.failed += 1;
                    break;
                }
                Err(err) => {
                    let attempts = self
                        .outbox
                        .record_failure(entry.id, &err.to_string())
                        .await?;
                    if attempts >= self.max_attempts {
                        error!(
                            "Dropping {} from outbox after {} rejected attempts: {}",
                            entry.resource, attempts, err
                        );
                        self.outbox.remove(entry.id).await?;
                        report.dropped += 1;
                    } else {
                        warn!(
                            "Push of {} rejected ({}/{}): {}",
                            entry.resource, attempts, self.max_attempts, err
                        );
                        report.failed += 1;
                    }
                }
            }
        }

        report.remaining = self.outbox.count().await?;
        if report.pushed > 0 || report.dropped > 0 {
            info!(
                pushed = report.pushed,
                failed = report.failed,
                dropped = report.dropped,
                remaining = report.remaining,
                "outbox drained"
            );
        }
        Ok(report)
    }

    /// Drains the outbox on every tick that finds pending entries and an online probe.
    pub fn spawn_outbox_drainer(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("Outbox drainer stopped");
                        break;
                    }
                    _ = ticker.tick() => {}
                }

                match service.outbox.count().await {
                    Ok(0) => continue,
                    Ok(_) => {}
                    Err(e) => {
                        error!("Outbox lookup failed: {}", e);
                        continue;
                    }
                }

                if let Err(e) = service.drain_outbox().await {
                    error!("Outbox drain error: {}", e);
                }
            }
        })
    }

    /// Local record and outbox entry are written under one lock so concurrent saves of a
    /// resource commit in the same order to both.
    async fn record_locally(
        &self,
        resource: &SyncedResource,
        content: &str,
    ) -> Result<NoteRecord, AppError> {
        let now = Utc::now();
        let record = NoteRecord::pending(resource, content.to_string(), now);

        let _guard = self.local_writes.lock().await;
        self.write_local(&record).await?;
        self.outbox.upsert(resource, content, now).await?;
        Ok(record)
    }

    /// Sends `content` to the server. On acknowledgement the outbox entry is completed and the
    /// local record marked synced, unless a newer edit superseded `content` meanwhile.
    async fn push(&self, resource: &SyncedResource, content: &str) -> Result<(), AppError> {
        self.in_flight.write().await.insert(resource.clone());
        let result = self.send(resource, content).await;
        self.in_flight.write().await.remove(resource);
        result?;

        self.outbox.complete(resource, content).await?;

        let _guard = self.local_writes.lock().await;
        if let Some(mut record) = self.read_local(resource).await? {
            if record.content == content && record.sync_status.is_pending() {
                record.mark_synced();
                self.write_local(&record).await?;
            }
        }
        info!(
            "{} pushed; server copy replaced without conflict detection (last write wins)",
            resource
        );
        Ok(())
    }

    async fn send(&self, resource: &SyncedResource, content: &str) -> Result<(), AppError> {
        let body = RemoteNote {
            content: content.to_string(),
        };
        let options = RequestOptions::json(HttpMethod::Put, &body)?;
        self.gateway
            .request(&resource.path(), options)
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn accept_server_copy(
        &self,
        resource: &SyncedResource,
        content: String,
    ) -> Result<Option<NoteRecord>, AppError> {
        let _guard = self.local_writes.lock().await;
        let local = self.read_local(resource).await?;

        // A save that landed during the read wins.
        if let Some(record) = local.as_ref().filter(|r| r.sync_status.is_pending()) {
            return Ok(Some(record.clone()));
        }

        if let Some(previous) = local.as_ref() {
            if previous.content != content {
                info!(
                    "Server copy of {} overwrote a different local copy (last write wins)",
                    resource
                );
            }
        }

        let mut record = NoteRecord::pending(
            resource,
            content,
            local.map(|r| r.last_local_edit).unwrap_or_else(Utc::now),
        );
        record.mark_synced();
        self.write_local(&record).await?;
        Ok(Some(record))
    }

    async fn read_local(&self, resource: &SyncedResource) -> Result<Option<NoteRecord>, AppError> {
        let key = local_key(resource)?;
        match self.store.get(&key).await? {
            Some(entry) => NoteRecord::from_bytes(&entry.payload).map(Some).map_err(|e| {
                AppError::DeserializationError(format!("Corrupt local record {key}: {e}"))
            }),
            None => Ok(None),
        }
    }

    async fn write_local(&self, record: &NoteRecord) -> Result<(), AppError> {
        let key = local_key(&record.resource())?;
        self.store
            .put(&key, &record.to_bytes()?, ResourceKind::NoteDraft)
            .await
    }
}

fn local_key(resource: &SyncedResource) -> Result<CacheKey, AppError> {
    resource.local_key().map_err(AppError::InvalidInput)
}
