//! Error types for movieapp
//!
//! This module defines all error types used throughout the library.
//! MovieError implements Serialize for Tauri compatibility and Clone so a
//! failure can be carried inside every published paging snapshot.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Error type for movieapp operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MovieError {
    /// The TMDB API key is absent or blank
    #[error("TMDB API key is missing. Set TMDB_API_KEY in the environment or .env file.")]
    MissingApiKey,

    /// The server answered with a non-success status
    #[error("HTTP request failed with status {status}")]
    Http { status: u16 },

    /// Connectivity or timeout failure
    #[error("Network error: {0}")]
    Transport(String),

    /// Response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Category has no remote listing (favorites)
    #[error("Category is not served by the remote API: {0}")]
    UnsupportedCategory(String),

    /// Page numbers start at 1
    #[error("Invalid page number: {0}")]
    InvalidPage(u32),

    /// Favorites storage failed to read or write
    #[error("Favorites storage error: {0}")]
    Storage(String),
}

impl MovieError {
    /// Whether repeating the same request may succeed.
    ///
    /// Configuration and programming errors are never retryable; HTTP
    /// statuses, transport and storage failures may succeed on a later try.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MovieError::Http { .. } | MovieError::Transport(_) | MovieError::Storage(_)
        )
    }

    /// Message suitable for an error banner or footer.
    pub fn user_message(&self) -> String {
        match self {
            MovieError::MissingApiKey => {
                "The app is not configured with a TMDB API key.".to_string()
            }
            MovieError::Http { status: 401 } => "The TMDB API key was rejected.".to_string(),
            MovieError::Http { status: 404 } => "The requested movies were not found.".to_string(),
            MovieError::Http { status: 429 } => {
                "Too many requests. Please wait a moment and retry.".to_string()
            }
            MovieError::Http { status } if *status >= 500 => {
                format!("TMDB is unavailable right now (status {}).", status)
            }
            MovieError::Http { status } => format!("Unable to load movies (status {}).", status),
            MovieError::Transport(_) => {
                "No connection. Check your network and retry.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for MovieError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => MovieError::Http {
                status: status.as_u16(),
            },
            None if err.is_decode() => MovieError::Decode(err.to_string()),
            None => MovieError::Transport(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for MovieError {
    fn from(err: serde_json::Error) -> Self {
        MovieError::Decode(err.to_string())
    }
}

/// Serialize MovieError as a string for Tauri compatibility
impl Serialize for MovieError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Result type alias for movieapp operations
pub type Result<T> = std::result::Result<T, MovieError>;
