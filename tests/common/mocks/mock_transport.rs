use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};

use lms_offline::application::ports::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, TransportError,
};

/// Scripted upstream API. Unscripted reads answer 404 and unscripted PUTs are acknowledged.
/// `set_offline(true)` makes every request fail before a response is produced.
#[derive(Clone, Default)]
pub struct FakeTransport {
    routes: Arc<RwLock<HashMap<(HttpMethod, String), (u16, Vec<u8>)>>>,
    gates: Arc<RwLock<HashMap<String, Arc<Notify>>>>,
    calls: Arc<RwLock<Vec<HttpRequest>>>,
    offline: Arc<AtomicBool>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn respond(
        &self,
        method: HttpMethod,
        url: &str,
        status: u16,
        body: impl Into<Vec<u8>>,
    ) {
        self.routes
            .write()
            .await
            .insert((method, url.to_string()), (status, body.into()));
    }

    pub async fn respond_json(&self, url: &str, body: serde_json::Value) {
        self.respond(HttpMethod::Get, url, 200, body.to_string()).await;
    }

    /// Holds requests to `url` until the returned `Notify` is signalled.
    pub async fn gate(&self, url: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates
            .write()
            .await
            .insert(url.to_string(), Arc::clone(&notify));
        notify
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn calls(&self) -> Vec<HttpRequest> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    pub async fn calls_to(&self, method: HttpMethod, url: &str) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|request| request.method == method && request.url == url)
            .count()
    }

    pub async fn clear_calls(&self) {
        self.calls.write().await.clear();
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.write().await.push(request.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::Connect(format!("{} unreachable", request.url)));
        }

        let gate = self.gates.read().await.get(&request.url).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let route = self
            .routes
            .read()
            .await
            .get(&(request.method, request.url.clone()))
            .cloned();

        match route {
            Some((status, body)) => Ok(HttpResponse { status, body }),
            None if request.method == HttpMethod::Put => Ok(HttpResponse {
                status: 200,
                body: request.body.unwrap_or_default(),
            }),
            None => Ok(HttpResponse {
                status: 404,
                body: b"not found".to_vec(),
            }),
        }
    }
}
