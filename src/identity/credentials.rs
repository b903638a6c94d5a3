//! Persisted credential storage.
//! The portal keeps a `token`/`user_id`/`role` triple in browser-local
//! storage; here that boundary is a trait so the store can be file-backed on
//! desktop shells and in-memory under test. The triple is never partial: all
//! three fields are written or cleared together.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::principal::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub token: String,
    pub user_id: String,
    pub role: Role,
}

pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Option<Credentials>;
    fn save(&self, creds: &Credentials);
    fn clear(&self);
}

/// In-memory slot, used by tests and embedded callers.
#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: RwLock<Option<Credentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(creds: Credentials) -> Self {
        Self { slot: RwLock::new(Some(creds)) }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<Credentials> {
        self.slot.read().clone()
    }

    fn save(&self, creds: &Credentials) {
        *self.slot.write() = Some(creds.clone());
    }

    fn clear(&self) {
        *self.slot.write() = None;
    }
}

/// On-disk representation; `saved_at` is informational only.
#[derive(Serialize, Deserialize)]
struct StoredCredentials {
    token: String,
    user_id: String,
    role: Role,
    saved_at: DateTime<Utc>,
}

/// Single JSON file holding the credential triple. Writes go through a
/// tmp-file rename so a crash mid-write can never leave a partial triple.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).ok();
        }
        Self { path }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Option<Credentials> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(_) => return None,
        };
        match serde_json::from_slice::<StoredCredentials>(&bytes) {
            Ok(s) => Some(Credentials { token: s.token, user_id: s.user_id, role: s.role }),
            Err(e) => {
                // Unreadable file counts as signed-out, not as an error.
                warn!("credential file unreadable, treating as absent: {}", e);
                None
            }
        }
    }

    fn save(&self, creds: &Credentials) {
        let stored = StoredCredentials {
            token: creds.token.clone(),
            user_id: creds.user_id.clone(),
            role: creds.role,
            saved_at: Utc::now(),
        };
        let bytes = match serde_json::to_vec_pretty(&stored) {
            Ok(b) => b,
            Err(e) => {
                warn!("credential serialize failed: {}", e);
                return;
            }
        };
        let tmp = self.path.with_extension("json.tmp");
        if std::fs::write(&tmp, bytes).is_ok() {
            if let Err(e) = std::fs::rename(&tmp, &self.path) {
                warn!("credential write failed: {}", e);
            } else {
                debug!("credentials saved user={}", creds.user_id);
            }
        }
    }

    fn clear(&self) {
        std::fs::remove_file(&self.path).ok();
        debug!("credentials cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_store_round_trips_the_triple() {
        let tmp = tempdir().unwrap();
        let store = FileCredentialStore::new(tmp.path().join("creds.json"));
        assert!(store.load().is_none());

        let creds = Credentials { token: "tok-1".into(), user_id: "u-9".into(), role: Role::Teacher };
        store.save(&creds);
        assert_eq!(store.load(), Some(creds));

        store.clear();
        assert!(store.load().is_none());
    }

    #[test]
    fn corrupt_file_reads_as_absent() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("creds.json");
        std::fs::write(&path, b"{not json").unwrap();
        let store = FileCredentialStore::new(&path);
        assert!(store.load().is_none());
    }

    #[test]
    fn memory_store_is_all_or_nothing() {
        let store = MemoryCredentialStore::new();
        let creds = Credentials { token: "t".into(), user_id: "u".into(), role: Role::Student };
        store.save(&creds);
        assert_eq!(store.load().unwrap().role, Role::Student);
        store.clear();
        assert!(store.load().is_none());
    }
}
