//! Error types for the NFC bridge.
//!
//! Every public operation either fails synchronously with one of these errors or,
//! for an accepted open, reports [`NfcError::OpenFailure`] through its completion
//! callback exactly once.

use std::fmt;

/// Result type alias for NFC operations.
pub type Result<T> = std::result::Result<T, NfcError>;

/// Stable classification of an [`NfcError`], suitable for hosts that expose
/// error codes rather than Rust types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    State,
    Resource,
    OpenFailure,
    Unimplemented,
}

impl ErrorKind {
    /// Code string used as the prefix of host-visible error messages.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::State => "StateError",
            ErrorKind::Resource => "ResourceError",
            ErrorKind::OpenFailure => "OpenFailure",
            ErrorKind::Unimplemented => "UnimplementedError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors that can occur while driving NFC contexts and devices.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NfcError {
    /// Malformed input, rejected before any resource is touched.
    #[error("invalid argument: {message}")]
    Validation { message: String },

    /// Operation issued against a context or device in the wrong state.
    #[error("invalid state: {message}")]
    State { message: String },

    /// Native allocation or work scheduling failed.
    #[error("resource failure: {message}")]
    Resource { message: String },

    /// The driver did not return a device.
    #[error("unable to open NFC device {target}: {reason}")]
    OpenFailure { target: String, reason: String },

    /// Placeholder operation.
    #[error("NFC unimplemented: {operation}")]
    Unimplemented { operation: &'static str },
}

impl NfcError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Host argument of the wrong type, e.g. a number passed as the connection string.
    pub fn wrong_type(argument: &str, expected: &str) -> Self {
        Self::validation(format!("{argument} must be {expected}"))
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    pub fn resource(message: impl Into<String>) -> Self {
        Self::Resource {
            message: message.into(),
        }
    }

    /// Create an open failure. An empty connection string is reported as the
    /// auto-detected device.
    pub fn open_failure(connstring: &str, reason: impl Into<String>) -> Self {
        let target = if connstring.is_empty() {
            "<auto>".to_string()
        } else {
            format!("\"{connstring}\"")
        };
        Self::OpenFailure {
            target,
            reason: reason.into(),
        }
    }

    pub fn unimplemented(operation: &'static str) -> Self {
        Self::Unimplemented { operation }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            NfcError::Validation { .. } => ErrorKind::Validation,
            NfcError::State { .. } => ErrorKind::State,
            NfcError::Resource { .. } => ErrorKind::Resource,
            NfcError::OpenFailure { .. } => ErrorKind::OpenFailure,
            NfcError::Unimplemented { .. } => ErrorKind::Unimplemented,
        }
    }
}
