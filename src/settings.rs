//! Client-core settings loaded from a JSON file, with defaults that match the
//! stock portal layout. Feeds the route filter, the cache TTL and the
//! credential file location.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::routing::{RouteFilter, PUBLIC_ENTRY};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "Settings::default_public_entry")]
    pub public_entry: String,
    #[serde(default)]
    pub protected_prefixes: Option<Vec<String>>,
    /// Time-to-live for cached query results, in milliseconds.
    #[serde(default = "Settings::default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    /// Where the credential triple is persisted; `None` keeps it in memory.
    #[serde(default)]
    pub credential_path: Option<PathBuf>,
}

impl Settings {
    fn default_public_entry() -> String {
        PUBLIC_ENTRY.to_string()
    }

    fn default_cache_ttl_ms() -> u64 {
        30_000
    }

    /// Read settings from a JSON file; a missing or unreadable file falls
    /// back to defaults so the client can always start.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match std::fs::read(path.as_ref()) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(s) => s,
                Err(e) => {
                    warn!("settings file unparseable, using defaults: {}", e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn route_filter(&self) -> RouteFilter {
        let mut filter = RouteFilter::default();
        filter.public_entry = self.public_entry.clone();
        if let Some(prefixes) = &self.protected_prefixes {
            filter.protected_prefixes = prefixes.clone();
        }
        filter
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            public_entry: Self::default_public_entry(),
            protected_prefixes: None,
            cache_ttl_ms: Self::default_cache_ttl_ms(),
            credential_path: None,
        }
    }
}
