use async_trait::async_trait;

/// Source of the bearer credential. Owned by the host application's auth layer.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn access_token(&self) -> Option<String>;

    /// Called when the API rejects the credential with 401.
    async fn invalidate(&self);
}
