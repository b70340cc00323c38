pub mod blob_store;
pub mod http_transport;
pub mod network_probe;
pub mod outbox_store;
pub mod session;

pub use blob_store::BlobStore;
pub use http_transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, TransportError};
pub use network_probe::{LinkSignal, NetworkProbe};
pub use outbox_store::OutboxStore;
pub use session::SessionProvider;
