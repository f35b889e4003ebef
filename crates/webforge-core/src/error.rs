// Error types for builds and build streams

use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for build operations
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors that can occur while generating or writing a project
#[derive(Debug, Error)]
pub enum BuildError {
    /// Generation backend error
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Generator produced nothing usable
    #[error("Generator returned no files")]
    EmptyOutput,

    /// Project store error
    #[error("Project store error: {0}")]
    Store(String),

    /// Generation did not finish in time
    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    /// Build task panicked
    #[error("Build task panicked: {0}")]
    Panicked(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl BuildError {
    /// Create a generation error
    pub fn generation(msg: impl Into<String>) -> Self {
        BuildError::Generation(msg.into())
    }

    /// Create a project store error
    pub fn store(msg: impl Into<String>) -> Self {
        BuildError::Store(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        BuildError::Configuration(msg.into())
    }
}

/// Errors raised by the build stream registry
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildStreamError {
    #[error("Session {0} not found")]
    SessionNotFound(Uuid),

    /// Another consumer already owns the live queue
    #[error("Session {0} is already being streamed")]
    StreamBusy(Uuid),
}
