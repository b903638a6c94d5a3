//! Process-wide session store: the single authoritative record of the
//! signed-in principal. Mutated only by `refresh`/`login`/`logout`; every
//! other component reads through `principal()` or a subscription.
//!
//! Each mutation bumps a generation counter. An async `refresh` that settles
//! after a newer mutation (e.g. a logout issued while the network call was in
//! flight) compares generations and discards its result, so state is always
//! last-write-wins in mutation order.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::credentials::{CredentialStore, Credentials};
use super::principal::Principal;
use super::provider::{AuthProvider, LoginRequest};

pub type ListenerId = u64;
type Listener = Box<dyn Fn(&Principal) + Send + Sync>;

struct State {
    principal: Principal,
    generation: u64,
}

struct Inner {
    state: RwLock<State>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: Mutex<ListenerId>,
    creds: Arc<dyn CredentialStore>,
}

/// Cloneable shared handle; all clones observe the same session.
#[derive(Clone)]
pub struct SessionStore(Arc<Inner>);

impl SessionStore {
    /// Starts in the loading state; call `refresh` to settle the principal
    /// from persisted credentials.
    pub fn new(creds: Arc<dyn CredentialStore>) -> Self {
        Self(Arc::new(Inner {
            state: RwLock::new(State { principal: Principal::loading(), generation: 0 }),
            listeners: Mutex::new(Vec::new()),
            next_listener: Mutex::new(1),
            creds,
        }))
    }

    /// Current principal, synchronous snapshot.
    pub fn principal(&self) -> Principal {
        self.0.state.read().principal.clone()
    }

    /// Generation of the most recent mutation. Monotonic.
    pub fn generation(&self) -> u64 {
        self.0.state.read().generation
    }

    /// Register a listener fired on every principal change, in registration
    /// order. Returns an id for `unsubscribe`.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Principal) + Send + Sync + 'static,
    {
        let mut next = self.0.next_listener.lock();
        let id = *next;
        *next += 1;
        drop(next);
        self.0.listeners.lock().push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.0.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Re-derive the principal from the trust boundary by presenting the
    /// persisted credential token. No credential resolves anonymous; a
    /// rejected credential resolves anonymous and clears the persisted
    /// triple. A result that arrives after a newer mutation is discarded.
    pub async fn refresh(&self, provider: &dyn AuthProvider) {
        let gen = self.swap(Principal::loading());
        let Some(creds) = self.0.creds.load() else {
            self.commit_if_current(gen, Principal::anonymous());
            return;
        };
        match provider.resolve(&creds.token).await {
            Ok(snap) => {
                let next = Principal::signed_in(snap.role);
                if self.commit_if_current(gen, next) {
                    // Write the triple back so a rotated token sticks.
                    self.0.creds.save(&Credentials {
                        token: snap.token,
                        user_id: snap.user_id,
                        role: snap.role,
                    });
                    info!("session refreshed role={}", snap.role);
                }
            }
            Err(err) => {
                warn!("session refresh rejected: {:#}", err);
                if self.commit_if_current(gen, Principal::anonymous()) {
                    self.0.creds.clear();
                }
            }
        }
    }

    /// Interactive sign-in. Persists the credential triple on success.
    pub async fn login(&self, provider: &dyn AuthProvider, req: &LoginRequest) -> anyhow::Result<Principal> {
        let gen = self.swap(Principal::loading());
        match provider.login(req).await {
            Ok(snap) => {
                let next = Principal::signed_in(snap.role);
                if self.commit_if_current(gen, next.clone()) {
                    self.0.creds.save(&Credentials {
                        token: snap.token,
                        user_id: snap.user_id.clone(),
                        role: snap.role,
                    });
                    info!("auth.login user={} role={}", snap.user_id, snap.role);
                }
                Ok(next)
            }
            Err(err) => {
                self.commit_if_current(gen, Principal::anonymous());
                Err(err)
            }
        }
    }

    /// Synchronous sign-out: clears the persisted triple and the principal in
    /// one mutation. Any in-flight refresh settles against the new generation
    /// and is discarded.
    pub fn logout(&self) {
        self.0.creds.clear();
        self.swap(Principal::anonymous());
        info!("auth.logout");
    }

    fn swap(&self, next: Principal) -> u64 {
        let gen;
        {
            let mut st = self.0.state.write();
            st.generation += 1;
            gen = st.generation;
            st.principal = next.clone();
        }
        self.notify(&next);
        gen
    }

    /// Apply `next` only if no other mutation landed since `expected`.
    fn commit_if_current(&self, expected: u64, next: Principal) -> bool {
        {
            let mut st = self.0.state.write();
            if st.generation != expected {
                debug!(
                    "discarding stale session result (gen {} superseded by {})",
                    expected, st.generation
                );
                return false;
            }
            st.generation += 1;
            st.principal = next.clone();
        }
        self.notify(&next);
        true
    }

    fn notify(&self, principal: &Principal) {
        let listeners = self.0.listeners.lock();
        for (_, f) in listeners.iter() {
            f(principal);
        }
    }
}
