use crate::domain::value_objects::ConnectivityState;
use async_trait::async_trait;

/// Answers "can we reach the API right now". Implementations must not cache the answer.
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    async fn current_state(&self) -> ConnectivityState;
}

/// Data-link signal reported by the host platform (interface up / associated with a network).
pub trait LinkSignal: Send + Sync {
    fn is_link_up(&self) -> bool;
}
