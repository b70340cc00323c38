use crate::application::ports::session::SessionProvider;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Holds the bearer token handed over by the host application's auth layer.
#[derive(Debug, Clone, Default)]
pub struct InMemorySession {
    token: Arc<RwLock<Option<String>>>,
}

impl InMemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(Some(token.into()))),
        }
    }

    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }
}

#[async_trait]
impl SessionProvider for InMemorySession {
    async fn access_token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    async fn invalidate(&self) {
        let mut token = self.token.write().await;
        if token.take().is_some() {
            info!("Session invalidated after 401 response");
        }
    }
}
