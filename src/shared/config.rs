use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Reachability endpoint. `None` means `<base_url>/health`.
    #[serde(default)]
    pub probe_url: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_url: String,
    /// 0 disables size-bounded eviction.
    pub max_cache_bytes: u64,
    /// 0 disables TTL eviction.
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_drain: bool,
    pub drain_interval_secs: u64,
    pub max_attempts: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8080/api".to_string(),
                probe_url: None,
                request_timeout_secs: 30,
            },
            storage: StorageConfig {
                database_url: default_database_url(),
                max_cache_bytes: 512 * 1024 * 1024, // 512MB
                cache_ttl_secs: 7 * 24 * 3600,      // 7 days
            },
            sync: SyncConfig {
                auto_drain: true,
                drain_interval_secs: 15,
                max_attempts: 10,
            },
        }
    }
}

impl ApiConfig {
    pub fn resolved_probe_url(&self) -> String {
        match &self.probe_url {
            Some(url) => url.clone(),
            None => format!("{}/health", self.base_url.trim_end_matches('/')),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Applies `LMS_OFFLINE_*` overrides read through `lookup` on top of the defaults.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("LMS_OFFLINE_API_BASE_URL") {
            let v = v.trim();
            if !v.is_empty() {
                cfg.api.base_url = v.to_string();
            }
        }
        if let Some(v) = lookup("LMS_OFFLINE_PROBE_URL") {
            let v = v.trim();
            cfg.api.probe_url = if v.is_empty() {
                None
            } else {
                Some(v.to_string())
            };
        }
        if let Some(value) = lookup("LMS_OFFLINE_REQUEST_TIMEOUT_SECS").and_then(|v| parse_u64(&v)) {
            cfg.api.request_timeout_secs = value;
        }

        if let Some(v) = lookup("LMS_OFFLINE_DATABASE_URL") {
            let v = v.trim();
            if !v.is_empty() {
                cfg.storage.database_url = v.to_string();
            }
        }
        if let Some(value) = lookup("LMS_OFFLINE_MAX_CACHE_BYTES").and_then(|v| parse_u64(&v)) {
            cfg.storage.max_cache_bytes = value;
        }
        if let Some(value) = lookup("LMS_OFFLINE_CACHE_TTL_SECS").and_then(|v| parse_u64(&v)) {
            cfg.storage.cache_ttl_secs = value;
        }

        if let Some(v) = lookup("LMS_OFFLINE_AUTO_DRAIN") {
            cfg.sync.auto_drain = parse_bool(&v, cfg.sync.auto_drain);
        }
        if let Some(value) = lookup("LMS_OFFLINE_DRAIN_INTERVAL_SECS").and_then(|v| parse_u64(&v)) {
            cfg.sync.drain_interval_secs = value;
        }
        if let Some(value) = lookup("LMS_OFFLINE_MAX_ATTEMPTS").and_then(|v| parse_u32(&v)) {
            cfg.sync.max_attempts = value.max(1);
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        let base = self.api.base_url.trim();
        if base.is_empty() {
            return Err("API base_url must not be empty".to_string());
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(format!("API base_url must be an http(s) URL: {base}"));
        }
        if self.api.request_timeout_secs == 0 {
            return Err("API request_timeout_secs must be greater than 0".to_string());
        }
        if self.storage.database_url.trim().is_empty() {
            return Err("Storage database_url must not be empty".to_string());
        }
        if self.sync.drain_interval_secs == 0 {
            return Err("Sync drain_interval_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

fn default_database_url() -> String {
    let dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("./data"))
        .join("lms-offline");
    format!("sqlite://{}", dir.join("content.db").display())
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn parse_u32(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok()
}
