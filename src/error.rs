// Error types module

use thiserror::Error;

use crate::constants::TIMEOUT_STATUS;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Centralized error type for the client
///
/// Validation, configuration and signing errors are raised synchronously,
/// before any request leaves the process. Server errors carry the status
/// code and the message exactly as the remote service reported them.
#[derive(Debug, Error)]
pub enum Error {
    /// Unrecognized or invalid option value
    #[error("Invalid option '{option}': {message}")]
    Validation { option: String, message: String },

    /// Missing cloud name or credentials
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unsupported hash algorithm
    #[error("Signing error: {0}")]
    Signing(String),

    /// Non-2xx response, or a response body carrying an `error` object
    #[error("{message}")]
    Server { status: u16, message: String },

    /// Non-final chunk under the minimum part size
    #[error("{0}")]
    PartSize(String),

    /// Connection-level failure reported by the transport
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be parsed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Reading the upload source failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation attempted on a chunked session that already terminated
    #[error("Upload session closed: {0}")]
    SessionClosed(String),
}

impl Error {
    pub fn validation(option: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            option: option.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Error::Server {
            status,
            message: message.into(),
        }
    }

    /// HTTP status associated with the error, if any
    ///
    /// Only server errors carry one; client-side timeouts are reported
    /// as 499 by the transport.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Error::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the error was raised before any network activity
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::Validation { .. }
                | Error::Configuration(_)
                | Error::Signing(_)
                | Error::PartSize(_)
        )
    }

    pub fn is_timeout(&self) -> bool {
        self.http_status() == Some(TIMEOUT_STATUS)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidResponse(e.to_string())
    }
}
