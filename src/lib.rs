//! atrium client core
//! ------------------
//! The non-presentational core of the atrium academic portal front end:
//!
//! - `identity`: the process-wide session store (principal, credential
//!   persistence, trust-boundary providers) with generation-counted
//!   last-write-wins mutation.
//! - `routing`: the role ↔ route policy, the per-mount route guard state
//!   machine with its at-most-one-navigation guarantee, and the static
//!   prefix filter handed to the navigation boundary.
//! - `cache`: fingerprint-keyed query cache with TTL staleness and
//!   fetch-generation supersession.
//! - `mutation`: the optimistic write protocol
//!   (cancel → snapshot → apply → send → reconcile/rollback → settle).
//! - `api`: the opaque REST-like request/response boundary.
//!
//! Rendering, forms, toasts and concrete endpoint wrappers live outside this
//! crate; they consume these types through the documented operations only.

pub mod api;
pub mod cache;
pub mod error;
pub mod identity;
pub mod mutation;
pub mod routing;
pub mod settings;
