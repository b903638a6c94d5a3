//! Static route-prefix filter consumed by the navigation boundary.
//! A string-only check deciding whether a path is inside a protected area at
//! all; it sees no credential and must never be treated as enforcement. Real
//! gatekeeping happens in the route guard against the session store.

use serde::{Deserialize, Serialize};

use super::policy::PUBLIC_ENTRY;
use crate::identity::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteFilter {
    #[serde(default = "RouteFilter::default_public_entry")]
    pub public_entry: String,
    #[serde(default = "RouteFilter::default_protected_prefixes")]
    pub protected_prefixes: Vec<String>,
}

impl RouteFilter {
    fn default_public_entry() -> String {
        PUBLIC_ENTRY.to_string()
    }

    fn default_protected_prefixes() -> Vec<String> {
        Role::ALL.iter().map(|r| format!("/{}", r.as_str())).collect()
    }

    /// Whether the navigation boundary should defer to the client-side guard
    /// for this path. Prefix string match only.
    pub fn is_protected(&self, path: &str) -> bool {
        self.protected_prefixes.iter().any(|p| {
            path == p.as_str()
                || path
                    .strip_prefix(p.as_str())
                    .map(|rest| rest.starts_with('/'))
                    .unwrap_or(false)
        })
    }

    pub fn is_public_entry(&self, path: &str) -> bool {
        path == self.public_entry
    }
}

impl Default for RouteFilter {
    fn default() -> Self {
        Self {
            public_entry: Self::default_public_entry(),
            protected_prefixes: Self::default_protected_prefixes(),
        }
    }
}
