//! Error types for Spanscope

use thiserror::Error;

/// Result type alias using Spanscope's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Spanscope operations
#[derive(Error, Debug)]
pub enum Error {
    /// No read token could be found
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// A caller-supplied parameter failed validation
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Why the value was rejected
        reason: String,
    },

    /// The backend rejected the credential
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Network failure, timeout or unexpected response
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend reported the query itself as invalid
    #[error("Query failed: {0}")]
    BackendQuery(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The operation was interrupted before a complete result was available
    #[error("Interrupted before the query completed")]
    Cancelled,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid parameter error
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Whether the error was raised before any request left the process
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential(_) | Self::InvalidParameter { .. } | Self::Config(_)
        )
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        if self.is_precondition() {
            2
        } else {
            1
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport(format!("request timed out: {err}"))
        } else if err.is_decode() {
            Self::Transport(format!("malformed response body: {err}"))
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
