pub mod download_manager;
pub mod note_sync_service;
pub mod request_gateway;

pub use download_manager::{DownloadHandle, DownloadManager};
pub use note_sync_service::{DrainReport, NoteSyncService, SaveOutcome};
pub use request_gateway::{GatewayResponse, RequestGateway, RequestOptions};
