use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use lms_offline::application::ports::NetworkProbe;
use lms_offline::domain::value_objects::ConnectivityState;

#[derive(Debug, Clone)]
pub struct MockNetworkProbe {
    state: Arc<RwLock<ConnectivityState>>,
    queries: Arc<AtomicUsize>,
}

impl MockNetworkProbe {
    pub fn new(state: ConnectivityState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            queries: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn online() -> Self {
        Self::new(ConnectivityState::Online)
    }

    pub fn offline() -> Self {
        Self::new(ConnectivityState::Offline)
    }

    pub async fn set_state(&self, state: ConnectivityState) {
        *self.state.write().await = state;
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkProbe for MockNetworkProbe {
    async fn current_state(&self) -> ConnectivityState {
        self.queries.fetch_add(1, Ordering::SeqCst);
        *self.state.read().await
    }
}
