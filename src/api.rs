//! Opaque REST-like API boundary.
//! The core never speaks HTTP itself; callers inject an `ApiClient` and the
//! core interprets the typed failure. 4xx/5xx are treated uniformly as
//! "request failed" except 404 on read paths, which resolves to an absent
//! value rather than an error.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::cache::{CacheKey, QueryCache};
use std::time::Duration;

/// Typed failure surfaced by the API boundary: an HTTP-like status plus an
/// optional server-supplied message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("api request failed: status {status} ({})", .message.as_deref().unwrap_or("no message"))]
pub struct ApiError {
    pub status: u16,
    pub message: Option<String>,
}

impl ApiError {
    pub fn new(status: u16) -> Self { Self { status, message: None } }

    pub fn with_message(status: u16, msg: impl Into<String>) -> Self {
        Self { status, message: Some(msg.into()) }
    }

    pub fn is_not_found(&self) -> bool { self.status == 404 }
    pub fn is_client_error(&self) -> bool { (400..500).contains(&self.status) }
    pub fn is_server_error(&self) -> bool { (500..600).contains(&self.status) }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: String,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self { method: "GET".into(), path: path.into(), body: None }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self { method: "POST".into(), path: path.into(), body: Some(body) }
    }
}

/// Request/response boundary. Implementations wrap the actual transport; the
/// core only sees JSON in and JSON (or a typed error) out.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn send(&self, req: ApiRequest) -> ApiResult<Value>;
}

/// Read path wired through the cache's ticket protocol.
///
/// A fresh cached value short-circuits the request entirely. Otherwise a
/// fetch ticket is opened before the request and the completion is applied
/// through it, so a response that arrives after `cancel_in_flight` (or after
/// a newer fetch superseded this one) is discarded instead of overwriting a
/// newer entry. A 404 completes the read with an absent value, not an error.
pub async fn fetch_query(
    cache: &QueryCache,
    client: &dyn ApiClient,
    key: &CacheKey,
    req: ApiRequest,
    ttl: Duration,
) -> ApiResult<Option<Value>> {
    if cache.is_fresh(key, ttl) {
        // A cached Null is a remembered 404: absent, not an error.
        return Ok(cache.value(key).filter(|v| !v.is_null()));
    }
    let ticket = cache.begin_fetch(key);
    match client.send(req).await {
        Ok(value) => {
            cache.complete_fetch(ticket, Ok(value.clone()));
            Ok(Some(value))
        }
        Err(err) if err.is_not_found() => {
            cache.complete_fetch(ticket, Ok(Value::Null));
            Ok(None)
        }
        Err(err) => {
            cache.complete_fetch(ticket, Err(err.clone()));
            Err(err)
        }
    }
}
