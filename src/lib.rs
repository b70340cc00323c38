//! Offline-first content cache and sync engine for the LMS client.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use application::services::{
    DownloadHandle, DownloadManager, DrainReport, GatewayResponse, NoteSyncService,
    RequestGateway, RequestOptions, SaveOutcome,
};
pub use shared::{AppConfig, AppError, Result};
pub use state::OfflineState;

/// Installs the global tracing subscriber. Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lms_offline=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
