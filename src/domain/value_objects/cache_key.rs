use serde::{Deserialize, Serialize};
use std::fmt;

const LOCAL_PREFIX: &str = "local:";

/// Stable identifier of a stored blob, derived from a resource's canonical address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(value: String) -> Result<Self, String> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    /// Key for a record authored on this device, kept apart from server-shaped GET snapshots.
    pub fn local(path: &str) -> Result<Self, String> {
        Self::new(format!("{LOCAL_PREFIX}{}", path.trim_start_matches('/')))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_PREFIX)
    }

    fn validate(value: &str) -> Result<(), String> {
        if value.trim().is_empty() {
            return Err("Cache key cannot be empty".to_string());
        }
        Ok(())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}
