//! Error types for the account chooser relay.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use account_chooser_relay::{ClientRequest, Result};
//!
//! fn example(client: &Client) -> Result<()> {
//!     let request = ClientRequest::manage("manage", None)?;
//!     client.call_server(request)?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants | Delivery |
//! |----------|----------|----------|
//! | Configuration | [`Error::Config`] | Returned by the builder, fatal |
//! | Validation | [`Error::Validation`], [`Error::InvalidArgument`] | Returned to the caller |
//! | Protocol | [`Error::Protocol`], [`Error::Json`] | Logged and dropped by the transport |
//! | Remote | [`Error::Remote`] | Only from [`Response::into_result`](crate::protocol::Response::into_result) |
//! | Runtime | [`Error::ChannelClosed`] | Client event loop has stopped |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;

use crate::protocol::RpcError;
use crate::validation::ValidationError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when a required init option is missing or empty.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// Outbound request failed its method schema.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Invalid argument passed to a constructor.
    ///
    /// Returned when a message precondition is violated (empty id, empty
    /// account list, conflicting schema fields).
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Malformed or unrecognized inbound message.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Error object carried by a remote response.
    #[error("Remote error {}: {}", .0.code, .0.message)]
    Remote(RpcError),

    // ========================================================================
    // Runtime Errors
    // ========================================================================
    /// The client event loop is no longer running.
    #[error("Channel closed")]
    ChannelClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<RecvError> for Error {
    fn from(_: RecvError) -> Self {
        Self::ChannelClosed
    }
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a remote error from a JSON-RPC error object.
    #[inline]
    pub fn remote(error: RpcError) -> Self {
        Self::Remote(error)
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a configuration error.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Returns `true` if the request was rejected before being sent.
    #[inline]
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidArgument { .. })
    }

    /// Returns `true` if this error came from the remote side.
    #[inline]
    #[must_use]
    pub fn is_remote_error(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// Returns `true` if this error is fatal to the session.
    ///
    /// Only configuration errors abort initialization; everything else is
    /// either absorbed locally or routed through the response channel.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.is_config_error()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = Error::config("serverSpec.domain is required");
        assert_eq!(
            err.to_string(),
            "Configuration error: serverSpec.domain is required"
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_validation_error_from() {
        let err: Error = ValidationError::new("email is required.").into();
        assert!(err.is_validation_error());
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "Validation error: email is required.");
    }

    #[test]
    fn test_remote_error_display() {
        let err = Error::remote(RpcError::method_not_found(None));
        assert!(err.is_remote_error());
        assert_eq!(err.to_string(), "Remote error -32601: Method not found");
    }

    #[test]
    fn test_is_validation_error() {
        let arg_err = Error::invalid_argument("id must not be empty");
        let proto_err = Error::protocol("bad json");

        assert!(arg_err.is_validation_error());
        assert!(!proto_err.is_validation_error());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
