pub mod cache_key;
pub mod connectivity;
pub mod resource_kind;
pub mod resource_path;
pub mod sync_status;
pub mod synced_resource;

pub use cache_key::CacheKey;
pub use connectivity::ConnectivityState;
pub use resource_kind::ResourceKind;
pub use resource_path::ResourcePath;
pub use sync_status::{SyncState, SyncStatus};
pub use synced_resource::{SyncedResource, SyncedResourceKind};
