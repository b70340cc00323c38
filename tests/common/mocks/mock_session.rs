use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use lms_offline::application::ports::SessionProvider;

#[derive(Debug, Clone, Default)]
pub struct RecordingSession {
    token: Arc<RwLock<Option<String>>>,
    invalidations: Arc<AtomicUsize>,
}

impl RecordingSession {
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Arc::new(RwLock::new(Some(token.to_string()))),
            invalidations: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn invalidation_count(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for RecordingSession {
    async fn access_token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    async fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        *self.token.write().await = None;
    }
}
