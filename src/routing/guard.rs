//! Per-mount route authorization guard.
//!
//! One guard instance lives for the lifetime of one protected mount. Session
//! changes are fed in through `observe` (cheap, callable from a subscription
//! callback); the decision is committed with `decide`, which always acts on
//! the latest observed principal. That split coalesces rapid principal
//! transitions (loading → wrong role → logout) into a single committed
//! decision, and the `Redirecting`/`Authorized` terminal states make the
//! at-most-one-navigation guarantee structural rather than a side flag.
//!
//! Anything other than `Authorized` renders a placeholder: protected content
//! must never flash before the role check resolves.

use tracing::{debug, warn};

use super::policy::RoutePolicy;
use crate::identity::{Principal, Role, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Principal still loading.
    Pending,
    /// Principal loaded, decision not yet committed.
    Checking,
    /// Terminal: children may render.
    Authorized,
    /// Terminal: the single navigation for this mount has been issued.
    Redirecting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Pending,
    Authorized,
    Redirect(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Placeholder,
    Content,
}

/// Navigation boundary. Receives the single resolved navigation per mount;
/// `replace` is location-replace semantics, never push.
pub trait Navigator: Send + Sync {
    fn replace(&self, path: &str);
}

pub struct RouteGuard {
    required: Role,
    state: GuardState,
    latest: Principal,
}

impl RouteGuard {
    pub fn new(required: Role) -> Self {
        Self { required, state: GuardState::Pending, latest: Principal::loading() }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn required_role(&self) -> Role {
        self.required
    }

    /// Record a principal change. Does not decide anything; terminal states
    /// ignore further changes.
    pub fn observe(&mut self, principal: &Principal) {
        match self.state {
            GuardState::Authorized | GuardState::Redirecting => return,
            GuardState::Pending | GuardState::Checking => {
                self.latest = principal.clone();
                if !principal.is_loading {
                    self.state = GuardState::Checking;
                }
            }
        }
    }

    /// Convenience: observe the store's current value.
    pub fn observe_store(&mut self, store: &SessionStore) {
        self.observe(&store.principal());
    }

    /// Commit a decision from the latest observed principal.
    ///
    /// In `Checking` this transitions to a terminal state; an unauthorized
    /// principal moves to `Redirecting` before the navigator is invoked, so
    /// re-entrant principal updates triggered by the navigation cannot issue
    /// a second one. After `Redirecting` this keeps returning `Pending`
    /// (placeholder) and never navigates again.
    pub fn decide(&mut self, policy: &RoutePolicy, nav: &dyn Navigator) -> GuardDecision {
        match self.state {
            GuardState::Pending => GuardDecision::Pending,
            GuardState::Authorized => GuardDecision::Authorized,
            GuardState::Redirecting => GuardDecision::Pending,
            GuardState::Checking => {
                let p = self.latest.clone();
                let authorized = p.is_authenticated && p.role == Some(self.required);
                if authorized {
                    self.state = GuardState::Authorized;
                    debug!("guard authorized role={}", self.required);
                    return GuardDecision::Authorized;
                }
                self.state = GuardState::Redirecting;
                let target = redirect_target(&p, policy);
                nav.replace(&target);
                debug!("guard redirect required={} target={}", self.required, target);
                GuardDecision::Redirect(target)
            }
        }
    }

    /// Placeholder unless the mount reached `Authorized`.
    pub fn render(&self) -> RenderState {
        if self.state == GuardState::Authorized {
            RenderState::Content
        } else {
            RenderState::Placeholder
        }
    }
}

fn redirect_target(p: &Principal, policy: &RoutePolicy) -> String {
    if !p.is_authenticated {
        return policy.public_entry().to_string();
    }
    match p.role {
        None => policy.public_entry().to_string(),
        Some(role) => match policy.route_for_role(role) {
            Some(route) => route.to_string(),
            None => {
                // Policy gap, not a user error; fall back to the public entry.
                warn!("no canonical route mapped for role={}", role);
                policy.public_entry().to_string()
            }
        },
    }
}
