use crate::application::ports::{BlobStore, HttpTransport, NetworkProbe, OutboxStore, SessionProvider};
use crate::application::services::{DownloadManager, NoteSyncService, RequestGateway};
use crate::infrastructure::database::ConnectionPool;
use crate::infrastructure::network::{ManualLinkSignal, ReachabilityProbe, ReqwestTransport};
use crate::infrastructure::session::InMemorySession;
use crate::infrastructure::storage::{EvictionPolicy, SqliteBlobStore, SqliteOutboxStore};
use crate::shared::config::AppConfig;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Wires every component of the offline layer together. Screens hold a clone of this.
#[derive(Clone)]
pub struct OfflineState {
    pub config: AppConfig,
    pub db_pool: ConnectionPool,
    pub store: Arc<dyn BlobStore>,
    pub link: ManualLinkSignal,
    pub probe: Arc<dyn NetworkProbe>,
    pub session: Arc<InMemorySession>,
    pub gateway: Arc<RequestGateway>,
    pub downloads: Arc<DownloadManager>,
    pub sync: Arc<NoteSyncService>,
    shutdown: CancellationToken,
    drainer: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl OfflineState {
    pub async fn initialize(config: AppConfig) -> anyhow::Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

        ensure_database_dir(&config.storage.database_url)?;
        let db_pool = ConnectionPool::new(&config.storage.database_url).await?;
        db_pool.migrate().await?;
        info!("Content database ready at {}", config.storage.database_url);

        let store: Arc<dyn BlobStore> = Arc::new(SqliteBlobStore::new(
            db_pool.clone(),
            EvictionPolicy::from(&config.storage),
        ));
        let outbox: Arc<dyn OutboxStore> = Arc::new(SqliteOutboxStore::new(db_pool.clone()));

        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(
            Duration::from_secs(config.api.request_timeout_secs),
        )?);
        let link = ManualLinkSignal::default();
        let probe: Arc<dyn NetworkProbe> = Arc::new(ReachabilityProbe::new(
            Arc::new(link.clone()),
            Arc::clone(&transport),
            config.api.resolved_probe_url(),
        ));
        let session = Arc::new(InMemorySession::new());

        let gateway = Arc::new(RequestGateway::new(
            config.api.base_url.clone(),
            transport,
            Arc::clone(&session) as Arc<dyn SessionProvider>,
            Arc::clone(&store),
        ));
        let downloads = Arc::new(DownloadManager::new(
            Arc::clone(&gateway),
            Arc::clone(&store),
        ));
        let sync = Arc::new(NoteSyncService::new(
            Arc::clone(&gateway),
            Arc::clone(&store),
            outbox,
            Arc::clone(&probe),
            config.sync.max_attempts,
        ));

        let shutdown = CancellationToken::new();
        let drainer = if config.sync.auto_drain {
            Some(sync.spawn_outbox_drainer(
                Duration::from_secs(config.sync.drain_interval_secs),
                shutdown.child_token(),
            ))
        } else {
            None
        };

        Ok(Self {
            config,
            db_pool,
            store,
            link,
            probe,
            session,
            gateway,
            downloads,
            sync,
            shutdown,
            drainer: Arc::new(Mutex::new(drainer)),
        })
    }

    pub async fn shutdown(&self) {
        self.downloads.cancel_all().await;

        self.shutdown.cancel();
        if let Some(handle) = self.drainer.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("Outbox drainer ended abnormally: {}", e);
            }
        }

        self.gateway.flush_cache_writes().await;
        self.db_pool.close().await;
        info!("Offline layer shut down");
    }
}

fn ensure_database_dir(database_url: &str) -> anyhow::Result<()> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);
    let path = path.split('?').next().unwrap_or(path);

    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
