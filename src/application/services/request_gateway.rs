use crate::application::ports::blob_store::BlobStore;
use crate::application::ports::http_transport::{HttpMethod, HttpRequest, HttpTransport};
use crate::application::ports::session::SessionProvider;
use crate::domain::value_objects::{CacheKey, ResourceKind};
use crate::shared::error::AppError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub body: Option<Vec<u8>>,
    /// Do not attach the bearer credential even if one is available.
    pub skip_auth: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self {
            method: HttpMethod::Get,
            body: None,
            skip_auth: false,
        }
    }

    pub fn with_method(method: HttpMethod) -> Self {
        Self {
            method,
            ..Self::get()
        }
    }

    pub fn json<T: Serialize>(method: HttpMethod, body: &T) -> Result<Self, AppError> {
        Ok(Self {
            method,
            body: Some(serde_json::to_vec(body)?),
            skip_auth: false,
        })
    }

    pub fn without_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// Served from the blob store after the network attempt failed.
    pub from_cache: bool,
}

impl GatewayResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn error_for_status(self) -> Result<Self, AppError> {
        match self.status {
            s if (200..300).contains(&s) => Ok(self),
            404 => Err(AppError::NotFound(String::from_utf8_lossy(&self.body).into_owned())),
            status => Err(AppError::Http {
                status,
                message: String::from_utf8_lossy(&self.body).into_owned(),
            }),
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| AppError::DeserializationError(format!("Invalid response body: {e}")))
    }
}

/// Wraps every outbound API call.
///
/// Successful reads are mirrored into the blob store in the background; reads whose network
/// attempt fails outright are answered from the blob store when a snapshot exists.
/// Mutations never touch the store.
pub struct RequestGateway {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    session: Arc<dyn SessionProvider>,
    store: Arc<dyn BlobStore>,
    cache_writes: TaskTracker,
}

impl RequestGateway {
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        session: Arc<dyn SessionProvider>,
        store: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            transport,
            session,
            store,
            cache_writes: TaskTracker::new(),
        }
    }

    pub fn address_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn cache_key_for(&self, path: &str) -> Result<CacheKey, AppError> {
        CacheKey::new(self.address_for(path)).map_err(AppError::InvalidInput)
    }

    pub async fn get(&self, path: &str) -> Result<GatewayResponse, AppError> {
        self.request(path, RequestOptions::get()).await
    }

    pub async fn request(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<GatewayResponse, AppError> {
        let address = self.address_for(path);
        let read_only = options.method.is_read_only();

        let mut request = HttpRequest::new(options.method, address.clone());
        if !options.skip_auth {
            if let Some(token) = self.session.access_token().await {
                request
                    .headers
                    .push(("Authorization".to_string(), format!("Bearer {token}")));
            }
        }
        if options.body.is_some() {
            request
                .headers
                .push(("Content-Type".to_string(), "application/json".to_string()));
        }
        request.body = options.body;

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(err) if read_only => {
                debug!("{} {} failed ({}); trying cache", options.method, address, err);
                return self.serve_from_cache(&address, err.to_string()).await;
            }
            Err(err) => return Err(AppError::Transport(err.to_string())),
        };

        if response.status == 401 {
            warn!("{} {} returned 401; invalidating session", options.method, address);
            self.session.invalidate().await;
            return Err(AppError::Unauthorized(address));
        }

        let response = GatewayResponse {
            status: response.status,
            body: response.body,
            from_cache: false,
        };

        if read_only && response.is_success() {
            self.mirror_into_store(path, &address, &response.body);
        }

        Ok(response)
    }

    /// Waits for every background cache write started so far.
    pub async fn flush_cache_writes(&self) {
        self.cache_writes.close();
        self.cache_writes.wait().await;
        self.cache_writes.reopen();
    }

    fn mirror_into_store(&self, path: &str, address: &str, body: &[u8]) {
        let key = match CacheKey::new(address.to_string()) {
            Ok(key) => key,
            Err(err) => {
                warn!("Not caching {}: {}", address, err);
                return;
            }
        };
        let kind = ResourceKind::infer(path);
        let payload = body.to_vec();
        let store = Arc::clone(&self.store);

        self.cache_writes.spawn(async move {
            if let Err(err) = store.put(&key, &payload, kind).await {
                warn!("Failed to cache response for {}: {}", key, err);
            }
        });
    }

    async fn serve_from_cache(
        &self,
        address: &str,
        transport_error: String,
    ) -> Result<GatewayResponse, AppError> {
        let key = CacheKey::new(address.to_string()).map_err(AppError::InvalidInput)?;

        match self.store.get(&key).await {
            Ok(Some(entry)) => {
                debug!("Serving {} from cache (stored at {})", address, entry.stored_at);
                Ok(GatewayResponse {
                    status: 200,
                    body: entry.payload,
                    from_cache: true,
                })
            }
            Ok(None) => Err(AppError::Transport(transport_error)),
            Err(err) => {
                warn!("Cache lookup for {} failed: {}", address, err);
                Err(AppError::Transport(transport_error))
            }
        }
    }
}
