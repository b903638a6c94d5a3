//! Unified application error model and mapping helpers.
//! Guard-level failures never appear here: the route guard always resolves to
//! a redirect decision. This enum covers the API boundary, credential storage
//! and policy configuration gaps that boundary code needs to report, along
//! with the HTTP-style mapping used when surfacing them.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::api::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// No valid credential.
    Auth { code: String, message: String },
    /// Valid credential, mismatched role for the requested area.
    WrongRole { code: String, message: String },
    /// Policy gap: a role with no canonical route mapped, overlapping
    /// prefixes, or other misconfiguration.
    Config { code: String, message: String },
    /// A write was rejected by the server; the cache has been rolled back.
    Mutation { status: u16, message: String },
    /// A read failed; any stale cached value remains readable.
    Fetch { status: u16, message: String },
    /// Persisted credential storage could not be read or written.
    Credential { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn auth(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn wrong_role(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::WrongRole { code: code.into(), message: msg.into() } }
    pub fn config(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Config { code: code.into(), message: msg.into() } }
    pub fn credential(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Credential { code: code.into(), message: msg.into() } }
    pub fn internal(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    pub fn mutation_failed(err: &ApiError) -> Self {
        AppError::Mutation { status: err.status, message: err.message.clone().unwrap_or_default() }
    }

    pub fn fetch_failed(err: &ApiError) -> Self {
        AppError::Fetch { status: err.status, message: err.message.clone().unwrap_or_default() }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Auth { message, .. }
            | AppError::WrongRole { message, .. }
            | AppError::Config { message, .. }
            | AppError::Mutation { message, .. }
            | AppError::Fetch { message, .. }
            | AppError::Credential { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    /// Map to an HTTP status code for boundary code that reports errors that
    /// way. Mutation/Fetch keep the status the API boundary returned.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::Auth { .. } => 401,
            AppError::WrongRole { .. } => 403,
            AppError::Config { .. } => 500,
            AppError::Mutation { status, .. } | AppError::Fetch { status, .. } => *status,
            AppError::Credential { .. } => 503,
            AppError::Internal { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Mutation { status, message } => write!(f, "mutation_failed[{}]: {}", status, message),
            AppError::Fetch { status, message } => write!(f, "fetch_failed[{}]: {}", status, message),
            AppError::Auth { code, message }
            | AppError::WrongRole { code, message }
            | AppError::Config { code, message }
            | AppError::Credential { code, message }
            | AppError::Internal { code, message } => write!(f, "{}: {}", code, message),
        }
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal".into(), message: err.to_string() }
    }
}
