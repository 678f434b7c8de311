//! Backend error taxonomy

use thiserror::Error;

/// Errors from the remote scoring exchange
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// No connection could be made at all
    #[error("connection error: {0}")]
    Connectivity(String),

    /// The backend answered with a non-2xx status
    #[error("server error (status {status})")]
    Server { status: u16 },

    /// The body could not be parsed into any known response shape
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl BackendError {
    /// Category-specific text for the visible status message
    pub fn status_message(&self) -> String {
        match self {
            BackendError::Connectivity(_) => {
                "⚠ Connection error. Check your internet connection.".to_string()
            }
            BackendError::Server { .. } => "⚠ Server error. Try again.".to_string(),
            BackendError::Malformed(_) => "⚠ Invalid response from server.".to_string(),
        }
    }
}
