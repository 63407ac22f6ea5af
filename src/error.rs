//! Error types for the client.
//!
//! Every failure the client can report is one variant of [`Error`]. None of
//! them are fatal: callers convert them into a user-visible message with
//! [`Error::user_message`] and decide whether to retry with
//! [`Error::is_retryable`].

use thiserror::Error;

use crate::i18n::{self, Language};

/// Client error type.
#[derive(Error, Debug)]
pub enum Error {
    /// The backend rejected the supplied username/password.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// No stored credential, or the backend no longer accepts it.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Malformed input, rejected locally or by the backend.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The backend does not know the requested resource.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network or socket failure.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend signalled that the service is unavailable.
    #[error("Service unavailable")]
    ServiceUnavailable,

    /// API returned an error response not covered above.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local storage failure.
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether re-invoking the failed operation may succeed.
    ///
    /// Transport faults, server-side faults and service-unavailable signals
    /// are retryable. Nothing is retried automatically.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::ServiceUnavailable => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Catalogue key describing this error to a user.
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::Auth(_) => "invalidCredentials",
            Self::Unauthenticated => "sessionExpired",
            Self::Validation(_) => "validationError",
            Self::NotFound(_) => "conversationNotFound",
            Self::Transport(_) => "networkError",
            Self::ServiceUnavailable => "serviceUnavailable",
            Self::Api { .. } | Self::InvalidUrl(_) | Self::Json(_) | Self::Io(_) | Self::Config(_) => {
                "errorProcessing"
            }
        }
    }

    /// Language-resolved text for display.
    ///
    /// Validation details supplied by the server are shown verbatim.
    pub fn user_message(&self, language: Language) -> String {
        match self {
            Self::Validation(detail) if !detail.is_empty() => detail.clone(),
            other => i18n::translate(other.message_key(), language).to_string(),
        }
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
