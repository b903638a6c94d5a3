use anyhow::Result;
use async_trait::async_trait;

use super::principal::Role;

/// What the trust boundary hands back when a credential or login attempt is
/// accepted. The token may be rotated relative to the one presented.
#[derive(Debug, Clone)]
pub struct AuthSnapshot {
    pub token: String,
    pub user_id: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Trust boundary for deriving a session. `resolve` presents a stored token;
/// `login` presents interactive credentials. Both are opaque network calls as
/// far as the session store is concerned.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<AuthSnapshot>;
    async fn login(&self, req: &LoginRequest) -> Result<AuthSnapshot>;
}
