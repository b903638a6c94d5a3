//! Bidirectional role ↔ route-prefix mapping.
//! Pure and total over the closed role set in the default table; a custom
//! table can leave a role unmapped, which the guard treats as a policy gap
//! and resolves to the public entry point.

use once_cell::sync::Lazy;

use crate::error::{AppError, AppResult};
use crate::identity::Role;

pub const PUBLIC_ENTRY: &str = "/login";

static DEFAULT_POLICY: Lazy<RoutePolicy> = Lazy::new(RoutePolicy::default);

/// Shared instance of the stock table, for callers that never customize it.
pub fn default_policy() -> &'static RoutePolicy {
    &DEFAULT_POLICY
}

#[derive(Debug, Clone)]
pub struct RoutePolicy {
    routes: Vec<(Role, String)>,
    public_entry: String,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            routes: Role::ALL
                .iter()
                .map(|r| (*r, format!("/{}", r.as_str())))
                .collect(),
            public_entry: PUBLIC_ENTRY.to_string(),
        }
    }
}

impl RoutePolicy {
    /// Build a custom policy. Rejects duplicate roles and non-injective
    /// prefixes; a prefix nested under another's subtree would make
    /// `role_for_route` ambiguous.
    pub fn new(routes: Vec<(Role, String)>, public_entry: impl Into<String>) -> AppResult<Self> {
        for (i, (role, prefix)) in routes.iter().enumerate() {
            if !prefix.starts_with('/') {
                return Err(AppError::config("bad_prefix", format!("prefix must start with '/': {}", prefix)));
            }
            for (other_role, other_prefix) in routes.iter().skip(i + 1) {
                if role == other_role {
                    return Err(AppError::config("dup_role", format!("role mapped twice: {}", role)));
                }
                if prefix == other_prefix || under(prefix, other_prefix) || under(other_prefix, prefix) {
                    return Err(AppError::config(
                        "overlapping_prefix",
                        format!("prefixes overlap: {} vs {}", prefix, other_prefix),
                    ));
                }
            }
        }
        Ok(Self { routes, public_entry: public_entry.into() })
    }

    pub fn public_entry(&self) -> &str {
        &self.public_entry
    }

    /// Canonical route prefix for a role, if mapped.
    pub fn route_for_role(&self, role: Role) -> Option<&str> {
        self.routes
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, p)| p.as_str())
    }

    /// Role owning a path, by prefix match. `/teacher/classes/3` → Teacher.
    pub fn role_for_route(&self, path: &str) -> Option<Role> {
        self.routes
            .iter()
            .find(|(_, p)| path == p.as_str() || under(path, p))
            .map(|(r, _)| *r)
    }
}

/// True when `path` sits strictly inside `prefix`'s subtree.
fn under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .map(|rest| rest.starts_with('/'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_round_trips_for_all_roles() {
        let policy = RoutePolicy::default();
        for r in Role::ALL {
            let route = policy.route_for_role(r).expect("default table is total");
            assert_eq!(policy.role_for_route(route), Some(r));
        }
    }

    #[test]
    fn prefix_match_covers_nested_paths() {
        let policy = RoutePolicy::default();
        assert_eq!(policy.role_for_route("/teacher/classes/3"), Some(Role::Teacher));
        assert_eq!(policy.role_for_route("/teacherlounge"), None);
        assert_eq!(policy.role_for_route("/"), None);
        assert_eq!(policy.role_for_route(PUBLIC_ENTRY), None);
    }

    #[test]
    fn custom_policy_rejects_overlap() {
        let bad = RoutePolicy::new(
            vec![
                (Role::Student, "/portal".into()),
                (Role::Teacher, "/portal/staff".into()),
            ],
            "/login",
        );
        assert!(bad.is_err());

        let dup = RoutePolicy::new(
            vec![
                (Role::Student, "/a".into()),
                (Role::Student, "/b".into()),
            ],
            "/login",
        );
        assert!(dup.is_err());
    }

    #[test]
    fn unmapped_role_is_a_gap_not_a_panic() {
        let partial = RoutePolicy::new(vec![(Role::Student, "/student".into())], "/login").unwrap();
        assert_eq!(partial.route_for_role(Role::Admin), None);
        assert_eq!(partial.route_for_role(Role::Student), Some("/student"));
    }
}
