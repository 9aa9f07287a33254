//! Error types for NeuroNarrative
//!
//! This module defines the error types used throughout the client,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for NeuroNarrative operations
///
/// Covers configuration loading, remote service calls, the local
/// session store, session lifecycle misuse and audio input.
#[derive(Error, Debug)]
pub enum NarrativeError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The remote service answered with a non-success status
    #[error("Service error (status {status}): {message}")]
    Service {
        /// HTTP status code returned by the service
        status: u16,
        /// Message extracted from the error body
        message: String,
    },

    /// The remote service could not be reached or returned garbage
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Local session store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Operation requires an active child profile or chat session
    #[error("Session error: {0}")]
    Session(String),

    /// Audio capture or upload errors (microphone, unreadable recordings)
    #[error("Audio error: {0}")]
    Audio(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for NeuroNarrative operations
///
/// Uses `anyhow::Error` so callers can add context while propagating.
pub type Result<T> = anyhow::Result<T>;
