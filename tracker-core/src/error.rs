//! Error types for the tracker

use thiserror::Error;

/// Tracker-wide error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// The wallet address was rejected (locally or by a 400 response)
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    /// The API answered with a 5xx status
    #[error("Server error: {0}")]
    Server(String),

    /// Network failure or an unexpected non-2xx status
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl TrackerError {
    pub fn invalid_address(msg: impl Into<String>) -> Self {
        TrackerError::InvalidAddress(msg.into())
    }

    pub fn server(msg: impl Into<String>) -> Self {
        TrackerError::Server(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        TrackerError::Transport(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        TrackerError::Parse(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        TrackerError::Io(msg.into())
    }

    /// Message shown to the user in place of the positions table
    pub fn user_message(&self) -> String {
        match self {
            TrackerError::InvalidAddress(_) => "Invalid wallet address format".to_string(),
            TrackerError::Server(_) => "Server error. Please try again later.".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;
