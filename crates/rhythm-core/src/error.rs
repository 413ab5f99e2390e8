//! Core error types for rhythm-core.
//!
//! Four failure families cross module boundaries:
//!
//! - [`StorageError`]: the cycle store rejected a read or write. The session
//!   state machine logs these and keeps advancing.
//! - [`ConfigurationError`]: missing or placeholder credentials, unreadable
//!   config files. Suggestion providers treat these as "fall back".
//! - [`ProviderError`]: a break suggestion source failed (network, timeout,
//!   malformed payload). Triggers the next attempt in the chain.
//! - [`ValidationError`]: user input out of bounds. The only error meant to
//!   reach the user as a blocking message.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for rhythm-core.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Cycle store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the database file
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query or statement execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema creation failed
    #[error("Database initialization failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A stored row could not be decoded
    #[error("Invalid cycle row: {0}")]
    InvalidRow(String),
}

/// Configuration and credential errors.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("{provider} API key not configured")]
    MissingCredential { provider: String },

    #[error("{provider} API key is still the placeholder value")]
    PlaceholderCredential { provider: String },

    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("unknown config key: {0}")]
    UnknownKey(String),
}

/// Errors from a break suggestion source.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error(transparent)]
    NotConfigured(#[from] ConfigurationError),

    #[error("request failed: {0}")]
    Request(String),

    #[error("{provider} did not answer within {after_ms} ms")]
    Timeout { provider: String, after_ms: u64 },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("{0}")]
    NoResults(String),
}

impl ProviderError {
    pub fn is_not_configured(&self) -> bool {
        matches!(self, ProviderError::NotConfigured(_))
    }
}

/// User input errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Settings value outside its allowed range
    #[error("Work duration must be 1-60 minutes, break duration must be 1-30 minutes ({field} was {value})")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("'{input}' is not a number of minutes for {field}")]
    NotANumber { field: String, input: String },

    #[error("a mood must be selected before the timer can continue")]
    AwaitingMood,

    #[error("no work cycle is waiting for a mood")]
    NoPendingMood,

    #[error("pause the timer first")]
    WhileRunning,

    #[error("suggestions are only available during a break")]
    NotOnBreak,
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Request(err.to_string())
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
