use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed role set. Every role has exactly one canonical route prefix in the
/// routing policy; the mapping is injective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Coordinator,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Student, Role::Teacher, Role::Coordinator, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Coordinator => "coordinator",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "coordinator" => Ok(Role::Coordinator),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Authentication state of the current session. Owned exclusively by the
/// session store; `role` and `is_authenticated` always change together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub is_authenticated: bool,
    #[serde(default)]
    pub role: Option<Role>,
    pub is_loading: bool,
}

impl Principal {
    /// Initial state at application start, before the first refresh settles.
    pub fn loading() -> Self {
        Self { is_authenticated: false, role: None, is_loading: true }
    }

    pub fn anonymous() -> Self {
        Self { is_authenticated: false, role: None, is_loading: false }
    }

    pub fn signed_in(role: Role) -> Self {
        Self { is_authenticated: true, role: Some(role), is_loading: false }
    }
}

impl Default for Principal {
    fn default() -> Self {
        Self::loading()
    }
}
