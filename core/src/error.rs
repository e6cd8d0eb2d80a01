//! Error types for the transfer-handle core.
//!
//! # Design
//! `UseAfterDispose` gets a dedicated variant because it marks a caller bug
//! (the handle's resources are already gone) rather than a failed exchange.
//! Engine-level failures and HTTP-level failures are kept apart: a DNS or
//! TLS error is `Engine`, while a non-2xx status only becomes `HttpError`
//! when the handle was configured to fail on error. Nothing is retried by
//! the core; every error surfaces to the immediate caller.

use std::fmt;

use crate::info::InfoField;

/// Errors returned by `TransferHandle` and `HandleInfo` operations.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferError {
    /// An operation was attempted on a handle after `dispose`.
    UseAfterDispose,

    /// The transport failed to complete the exchange (DNS, connection,
    /// TLS, ...). Carries the engine's error code and message verbatim.
    Engine { code: i32, message: String },

    /// The server answered with status >= 400 while fail-on-error was set.
    HttpError { status: u16, message: String },

    /// The transport reported that the in-flight transfer was cancelled.
    Cancelled,

    /// Buffer growth failed while accumulating response data. The
    /// in-flight transfer is aborted; no partial response is returned.
    OutOfMemory,

    /// Metadata was queried before a completed transfer, or the transport
    /// could not supply the requested field.
    InfoUnavailable(InfoField),

    /// A configuration value was rejected, e.g. a malformed URL.
    InvalidConfiguration(String),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::UseAfterDispose => {
                write!(f, "handle used after dispose")
            }
            TransferError::Engine { code, message } => {
                write!(f, "transfer failed ({code}): {message}")
            }
            TransferError::HttpError { status, message } => {
                write!(f, "HTTP {status}: {message}")
            }
            TransferError::Cancelled => write!(f, "transfer cancelled"),
            TransferError::OutOfMemory => {
                write!(f, "out of memory while accumulating response")
            }
            TransferError::InfoUnavailable(field) => {
                write!(f, "info not available: {field:?}")
            }
            TransferError::InvalidConfiguration(msg) => {
                write!(f, "invalid configuration: {msg}")
            }
        }
    }
}

impl std::error::Error for TransferError {}
