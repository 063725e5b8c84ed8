//! Error taxonomy
//!
//! Every failure the client can observe falls into one of three kinds:
//! an expired session that could not be recovered, a domain/validation error
//! reported by the API, or a generic failure (network, decoding, storage).

use thiserror::Error;

/// Result type for wblog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the wblog client
#[derive(Error, Debug)]
pub enum Error {
    /// Refresh failed; the local session has been terminated.
    #[error("Session expired, please log in again")]
    SessionExpired,

    /// 401 on a request that was already replayed once.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("API error {status}: {detail}")]
    Api { status: u16, detail: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Only the author can modify this {0}")]
    NotAuthor(&'static str),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not logged in")]
    NotLoggedIn,
}

/// Coarse classification used to pick the user-facing reaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Terminal session loss, forces re-authentication
    SessionExpired,
    /// Domain error with a message meant for the user
    Validation,
    /// Anything else; shown as a generic notice
    Failure,
}

impl Error {
    /// Build an API error from a status code and raw response body.
    ///
    /// The body's `detail` field is used verbatim when present.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let detail = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|v| match v.get("detail") {
                Some(serde_json::Value::String(s)) => Some(s.clone()),
                Some(other) if !other.is_null() => Some(other.to_string()),
                _ => None,
            })
            .unwrap_or_default();

        Error::Api { status, detail }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::SessionExpired | Error::Unauthorized | Error::NotLoggedIn => {
                ErrorKind::SessionExpired
            }
            Error::Api { status, detail } if (400..500).contains(status) && !detail.is_empty() => {
                ErrorKind::Validation
            }
            Error::NotAuthor(_) | Error::InvalidInput(_) => ErrorKind::Validation,
            _ => ErrorKind::Failure,
        }
    }

    /// Text to show the user: the API's own message for validation errors,
    /// `fallback` for everything else.
    pub fn user_message(&self, fallback: &str) -> String {
        match (self.kind(), self) {
            (ErrorKind::Validation, Error::Api { detail, .. }) => detail.clone(),
            (ErrorKind::Validation, Error::InvalidInput(message)) => message.clone(),
            (ErrorKind::Validation, other) => other.to_string(),
            (ErrorKind::SessionExpired, other) => other.to_string(),
            (ErrorKind::Failure, _) => fallback.to_string(),
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::SessionExpired)
    }
}
