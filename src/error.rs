//! Error types for the e-commerce service client.
//!
//! Every fallible library call returns [`Result`]. Service faults reported
//! inside an otherwise well-formed response surface as
//! [`EcsError::Service`], carrying the shared [`FaultKind`] registered for
//! their fault code.

use crate::ecs::fault::ServiceFault;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, EcsError>;

/// Errors raised by the client.
#[derive(Debug, Error)]
pub enum EcsError {
    /// A configuration file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The cache directory is unusable.
    #[error("cache path {}: {reason}", path.display())]
    CachePath { path: PathBuf, reason: String },

    /// HTTP-level failure.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Locale code not present in the endpoint table.
    #[error("invalid locale: {0}")]
    Locale(String),

    /// No access key id was supplied or configured.
    #[error("key_id may not be empty")]
    MissingKeyId,

    /// A cart operation referenced an item that is not in the cart, or the
    /// cart has not been created yet.
    #[error("cart error: {0}")]
    Cart(String),

    /// An operation was constructed with invalid arguments.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Fault reported by the remote service.
    #[error(transparent)]
    Service(#[from] ServiceFault),

    /// The response body was not well-formed XML.
    #[error("malformed XML response: {0}")]
    Xml(String),

    /// The `kernel()` drill-down path does not exist in this response.
    #[error("no '{missing}' along kernel path {path}")]
    Kernel { path: String, missing: String },

    /// A scalar conversion was attempted on a list whose length is not one.
    #[error("list of {0} nodes has no scalar value")]
    NotScalar(usize),

    /// A scalar value did not parse as an integer.
    #[error("'{0}' is not an integer")]
    NotInteger(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transport failures.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("more than {0} redirections")]
    TooManyRedirects(usize),

    #[error("HTTP response code {0}")]
    Status(u16),

    #[error("redirect without a usable location: {0}")]
    BadRedirect(String),

    #[error("connection failed: {0}")]
    Connection(String),

    /// The peer dropped the connection mid-request.
    #[error("connection reset: {0}")]
    Reset(String),
}

impl EcsError {
    /// Returns the service fault if this error is one.
    pub fn as_fault(&self) -> Option<&ServiceFault> {
        match self {
            EcsError::Service(fault) => Some(fault),
            _ => None,
        }
    }

    /// Returns true for faults reported by the remote service.
    pub fn is_service_fault(&self) -> bool {
        matches!(self, EcsError::Service(_))
    }
}
