//! Result and error types for the core library

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
///
/// Every variant renders as a message that can be shown to a student as-is.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid ride details: {0}")]
    InvalidInput(String),

    #[error("Invalid email: {0}")]
    InvalidFormat(String),

    #[error("Email domain not allowed: {0}")]
    DomainNotAllowed(String),

    #[error("Ride not found: {0}")]
    RideNotFound(String),

    #[error("Ride is full")]
    RideFull,

    #[error("You cannot join a ride you posted")]
    CreatorCannotJoin,

    #[error("Only the creator can delete this ride")]
    Unauthorized,

    #[error("Ride was modified concurrently, please retry: {0}")]
    Conflict(String),

    #[error("Ride store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Not logged in. Run `hopon login <email>` first")]
    NotLoggedIn,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a not found error
    pub fn not_found(id: impl ToString) -> Self {
        Self::RideNotFound(id.to_string())
    }

    /// Create a store error, keeping the underlying message verbatim
    pub fn store(msg: impl ToString) -> Self {
        Self::StoreUnavailable(msg.to_string())
    }

    /// Stable snake_case name of the variant, for the event log
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::InvalidFormat(_) => "invalid_email",
            Error::DomainNotAllowed(_) => "domain_not_allowed",
            Error::RideNotFound(_) => "not_found",
            Error::RideFull => "ride_full",
            Error::CreatorCannotJoin => "creator_cannot_join",
            Error::Unauthorized => "unauthorized",
            Error::Conflict(_) => "conflict",
            Error::StoreUnavailable(_) => "store_unavailable",
            Error::NotLoggedIn => "not_logged_in",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
        }
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Self::store(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::store(err)
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for JSON output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a successful result with context
    pub fn ok_with_context(data: T, context: HashMap<String, serde_json::Value>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: Some(context),
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(e.to_string()),
        }
    }
}
