pub mod sqlite_blob_store;
pub mod sqlite_outbox_store;

pub use sqlite_blob_store::{EvictionPolicy, SqliteBlobStore};
pub use sqlite_outbox_store::SqliteOutboxStore;
