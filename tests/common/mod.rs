#![allow(dead_code)]

pub mod mocks;

use std::sync::Arc;

use lms_offline::application::ports::{BlobStore, NetworkProbe, OutboxStore, SessionProvider};
use lms_offline::application::services::{DownloadManager, NoteSyncService, RequestGateway};
use lms_offline::infrastructure::database::ConnectionPool;
use lms_offline::infrastructure::storage::{EvictionPolicy, SqliteBlobStore, SqliteOutboxStore};

use mocks::{FakeTransport, MockNetworkProbe, RecordingSession};

pub const BASE_URL: &str = "http://lms.test/api";
pub const TEST_TOKEN: &str = "token-123";

pub fn api(path: &str) -> String {
    format!("{BASE_URL}/{path}")
}

pub struct OfflineTestContext {
    pub pool: ConnectionPool,
    pub transport: FakeTransport,
    pub probe: MockNetworkProbe,
    pub session: Arc<RecordingSession>,
    pub store: Arc<dyn BlobStore>,
    pub outbox: Arc<dyn OutboxStore>,
    pub gateway: Arc<RequestGateway>,
}

impl OfflineTestContext {
    pub fn download_manager(&self) -> Arc<DownloadManager> {
        Arc::new(DownloadManager::new(
            Arc::clone(&self.gateway),
            Arc::clone(&self.store),
        ))
    }

    pub fn sync_service(&self, max_attempts: u32) -> Arc<NoteSyncService> {
        Arc::new(NoteSyncService::new(
            Arc::clone(&self.gateway),
            Arc::clone(&self.store),
            Arc::clone(&self.outbox),
            Arc::new(self.probe.clone()) as Arc<dyn NetworkProbe>,
            max_attempts,
        ))
    }
}

pub async fn setup_context() -> OfflineTestContext {
    let pool = ConnectionPool::from_memory()
        .await
        .expect("in-memory sqlite");
    pool.migrate().await.expect("migrations");

    let transport = FakeTransport::new();
    let session = Arc::new(RecordingSession::with_token(TEST_TOKEN));
    let store: Arc<dyn BlobStore> = Arc::new(SqliteBlobStore::new(
        pool.clone(),
        EvictionPolicy::unbounded(),
    ));
    let outbox: Arc<dyn OutboxStore> = Arc::new(SqliteOutboxStore::new(pool.clone()));
    let gateway = Arc::new(RequestGateway::new(
        BASE_URL,
        Arc::new(transport.clone()),
        Arc::clone(&session) as Arc<dyn SessionProvider>,
        Arc::clone(&store),
    ));

    OfflineTestContext {
        pool,
        transport,
        probe: MockNetworkProbe::online(),
        session,
        store,
        outbox,
        gateway,
    }
}
