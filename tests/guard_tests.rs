//! Route guard integration tests: redirect targets, the one-navigation
//! latch, render gating, and wiring against a live session store.

use std::sync::Arc;

use parking_lot::Mutex;

use atrium::identity::{MemoryCredentialStore, Principal, Role, SessionStore};
use atrium::routing::{
    default_policy, GuardDecision, GuardState, Navigator, RenderState, RouteGuard, RoutePolicy,
};

#[derive(Default)]
struct RecordingNavigator {
    calls: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn replace(&self, path: &str) {
        self.calls.lock().push(path.to_string());
    }
}

#[test]
fn unauthenticated_redirects_once_to_public_entry() {
    let policy = RoutePolicy::default();
    let nav = RecordingNavigator::default();
    let mut guard = RouteGuard::new(Role::Teacher);

    guard.observe(&Principal::anonymous());
    let decision = guard.decide(&policy, &nav);
    assert_eq!(decision, GuardDecision::Redirect("/login".to_string()));
    assert_eq!(nav.calls(), vec!["/login"]);
    assert_eq!(guard.render(), RenderState::Placeholder);

    // Later transitions cannot re-arm the latch.
    guard.observe(&Principal::signed_in(Role::Teacher));
    assert_eq!(guard.decide(&policy, &nav), GuardDecision::Pending);
    assert_eq!(nav.calls().len(), 1);
}

#[test]
fn wrong_role_redirects_once_to_own_canonical_route() {
    let policy = RoutePolicy::default();
    let nav = RecordingNavigator::default();
    let mut guard = RouteGuard::new(Role::Teacher);

    guard.observe(&Principal::signed_in(Role::Student));
    let decision = guard.decide(&policy, &nav);
    assert_eq!(decision, GuardDecision::Redirect("/student".to_string()));
    assert_eq!(nav.calls(), vec!["/student"]);
    assert_eq!(guard.state(), GuardState::Redirecting);
}

#[test]
fn loading_principal_renders_placeholder_and_never_navigates() {
    let policy = RoutePolicy::default();
    let nav = RecordingNavigator::default();
    let mut guard = RouteGuard::new(Role::Student);

    guard.observe(&Principal::loading());
    assert_eq!(guard.decide(&policy, &nav), GuardDecision::Pending);
    assert_eq!(guard.render(), RenderState::Placeholder);
    assert_eq!(guard.state(), GuardState::Pending);
    assert!(nav.calls().is_empty());
}

#[test]
fn matching_role_authorizes_and_stays_authorized() {
    let policy = default_policy();
    let nav = RecordingNavigator::default();
    let mut guard = RouteGuard::new(Role::Coordinator);

    guard.observe(&Principal::signed_in(Role::Coordinator));
    assert_eq!(guard.decide(policy, &nav), GuardDecision::Authorized);
    assert_eq!(guard.render(), RenderState::Content);

    // Terminal for this mount; later changes are the next mount's problem.
    guard.observe(&Principal::anonymous());
    assert_eq!(guard.decide(policy, &nav), GuardDecision::Authorized);
    assert!(nav.calls().is_empty());
}

#[test]
fn rapid_updates_coalesce_to_the_latest_principal() {
    let policy = RoutePolicy::default();
    let nav = RecordingNavigator::default();
    let mut guard = RouteGuard::new(Role::Teacher);

    // loading → student → teacher before the decision commits: only the
    // latest update is acted on.
    guard.observe(&Principal::loading());
    guard.observe(&Principal::signed_in(Role::Student));
    guard.observe(&Principal::signed_in(Role::Teacher));
    assert_eq!(guard.decide(&policy, &nav), GuardDecision::Authorized);
    assert!(nav.calls().is_empty());
}

#[test]
fn rapid_updates_issue_at_most_one_navigation() {
    let policy = RoutePolicy::default();
    let nav = RecordingNavigator::default();
    let mut guard = RouteGuard::new(Role::Teacher);

    guard.observe(&Principal::signed_in(Role::Teacher));
    guard.observe(&Principal::signed_in(Role::Student));
    let first = guard.decide(&policy, &nav);
    assert_eq!(first, GuardDecision::Redirect("/student".to_string()));

    // A logout arriving after the latch fired changes nothing.
    guard.observe(&Principal::anonymous());
    assert_eq!(guard.decide(&policy, &nav), GuardDecision::Pending);
    assert_eq!(nav.calls(), vec!["/student"]);
}

#[test]
fn policy_gap_falls_back_to_public_entry() {
    let partial =
        RoutePolicy::new(vec![(Role::Teacher, "/teacher".to_string())], "/login").unwrap();
    let nav = RecordingNavigator::default();
    let mut guard = RouteGuard::new(Role::Teacher);

    // Signed in as admin, but the table has no admin mapping.
    guard.observe(&Principal::signed_in(Role::Admin));
    assert_eq!(guard.decide(&partial, &nav), GuardDecision::Redirect("/login".to_string()));
    assert_eq!(nav.calls(), vec!["/login"]);
}

#[test]
fn guard_follows_a_live_session_store() {
    let store = SessionStore::new(Arc::new(MemoryCredentialStore::new()));
    let policy = RoutePolicy::default();
    let nav = RecordingNavigator::default();
    let guard = Arc::new(Mutex::new(RouteGuard::new(Role::Student)));

    let feed = guard.clone();
    store.subscribe(move |p| feed.lock().observe(p));

    // Still loading: nothing to decide.
    let mut g = guard.lock();
    g.observe_store(&store);
    assert_eq!(g.decide(&policy, &nav), GuardDecision::Pending);
    drop(g);

    // A logout notification settles the principal; the commit redirects once.
    store.logout();
    let mut g = guard.lock();
    assert_eq!(g.decide(&policy, &nav), GuardDecision::Redirect("/login".to_string()));
    assert_eq!(nav.calls(), vec!["/login"]);
}
