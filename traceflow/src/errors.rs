//! Error types for the traceflow library.
//!
//! Failures raised by a wrapped coroutine are deliberately *not* part of this
//! taxonomy: the driver forwards them verbatim as the coroutine's own error
//! type. The variants here cover destination configuration and IO, the only
//! operations of this crate that can fail recoverably.

use thiserror::Error;

/// The main error type for traceflow operations.
#[derive(Debug, Error)]
pub enum TraceflowError {
    /// The destination description named a kind this crate does not know.
    #[error("Unknown destination description: {0}")]
    UnknownDestination(String),

    /// The destination description contained a backslash, which is reserved
    /// for a future escape syntax.
    #[error("Unsupported escape character (\\) in destination text ({0:?})")]
    UnsupportedEscape(String),

    /// A `key=value` argument in a destination description was malformed or
    /// carried an unparseable value.
    #[error("Invalid destination argument {key}={value}")]
    InvalidDestinationArg {
        /// The argument key.
        key: String,
        /// The offending value text.
        value: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
