use crate::application::ports::http_transport::{HttpMethod, HttpRequest, HttpTransport};
use crate::application::ports::network_probe::{LinkSignal, NetworkProbe};
use crate::domain::value_objects::ConnectivityState;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Link flag flipped by the host platform's connectivity callbacks.
#[derive(Debug, Clone)]
pub struct ManualLinkSignal {
    up: Arc<AtomicBool>,
}

impl ManualLinkSignal {
    pub fn new(initially_up: bool) -> Self {
        Self {
            up: Arc::new(AtomicBool::new(initially_up)),
        }
    }

    pub fn set_link_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }
}

impl Default for ManualLinkSignal {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LinkSignal for ManualLinkSignal {
    fn is_link_up(&self) -> bool {
        self.up.load(Ordering::SeqCst)
    }
}

/// Link-up alone is not enough: `Online` also requires an HTTP answer from the probe endpoint.
pub struct ReachabilityProbe {
    link: Arc<dyn LinkSignal>,
    transport: Arc<dyn HttpTransport>,
    endpoint: String,
}

impl ReachabilityProbe {
    pub fn new(
        link: Arc<dyn LinkSignal>,
        transport: Arc<dyn HttpTransport>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            link,
            transport,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl NetworkProbe for ReachabilityProbe {
    async fn current_state(&self) -> ConnectivityState {
        if !self.link.is_link_up() {
            return ConnectivityState::Offline;
        }

        // Any status code proves there is an upstream path.
        match self
            .transport
            .send(HttpRequest::new(HttpMethod::Get, self.endpoint.clone()))
            .await
        {
            Ok(_) => ConnectivityState::Online,
            Err(err) => {
                debug!("Reachability check against {} failed: {}", self.endpoint, err);
                ConnectivityState::LimitedConnectivity
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::http_transport::{HttpResponse, TransportError};
    use std::sync::atomic::AtomicUsize;

    struct StubTransport {
        reachable: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HttpTransport for StubTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.reachable {
                Ok(HttpResponse {
                    status: 503,
                    body: Vec::new(),
                })
            } else {
                Err(TransportError::Connect("no route to host".into()))
            }
        }
    }

    fn probe(link_up: bool, reachable: bool) -> (ReachabilityProbe, Arc<StubTransport>) {
        let transport = Arc::new(StubTransport {
            reachable,
            calls: AtomicUsize::new(0),
        });
        let probe = ReachabilityProbe::new(
            Arc::new(ManualLinkSignal::new(link_up)),
            transport.clone(),
            "http://lms.test/api/health",
        );
        (probe, transport)
    }

    #[tokio::test]
    async fn link_down_is_offline_without_network_call() {
        let (probe, transport) = probe(false, true);
        assert_eq!(probe.current_state().await, ConnectivityState::Offline);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn link_up_without_upstream_is_limited() {
        let (probe, _) = probe(true, false);
        assert_eq!(
            probe.current_state().await,
            ConnectivityState::LimitedConnectivity
        );
    }

    #[tokio::test]
    async fn any_http_answer_means_online_and_is_never_cached() {
        let (probe, transport) = probe(true, true);
        assert_eq!(probe.current_state().await, ConnectivityState::Online);
        assert_eq!(probe.current_state().await, ConnectivityState::Online);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }
}
