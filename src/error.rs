//! Crate-level error type.
//!
//! Every fallible operation in the client returns [`ClientError`]. Variants
//! carry enough context (URL, status, detail) to render a notification
//! without inspecting the originating error.

use std::path::PathBuf;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by the research backend client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request could not be sent (DNS, refused connection, timeout).
    #[error("connection failed to {url}: {detail}")]
    Connect { url: String, detail: String },

    /// The backend replied with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// The response body was not the JSON shape we expected.
    #[error("could not decode response from {url}: {detail}")]
    Decode { url: String, detail: String },

    /// The stream body failed mid-read.
    #[error("stream read failed: {0}")]
    Stream(#[from] reqwest::Error),

    /// The stream body failed mid-read (non-reqwest source).
    #[error("stream read failed: {detail}")]
    StreamRead { detail: String },

    /// The backend reported an application-level error.
    #[error("{0}")]
    Backend(String),

    /// The operation needs an active session and there is none.
    #[error("no active session")]
    NoSession,

    /// A turn is already loading for this session.
    #[error("a response is still loading")]
    TurnInProgress,

    /// Config file could not be read or parsed.
    #[error("config error in {}: {detail}", path.display())]
    Config { path: PathBuf, detail: String },

    /// Local file I/O (PDF download target).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse grouping of failures, used to title user-facing notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Nothing reachable at the configured base URL.
    Unreachable,
    /// Non-2xx or undecodable response from a request/response endpoint.
    Request,
    /// The stream could not be opened or read.
    Transport,
    /// The backend said something went wrong.
    Backend,
    /// Local state or configuration prevented the operation.
    Local,
}

impl ClientError {
    /// Which bucket this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ClientError::Connect { .. } => ErrorCategory::Unreachable,
            ClientError::Http { .. } | ClientError::Decode { .. } => ErrorCategory::Request,
            ClientError::Stream(_) | ClientError::StreamRead { .. } => ErrorCategory::Transport,
            ClientError::Backend(_) => ErrorCategory::Backend,
            ClientError::NoSession
            | ClientError::TurnInProgress
            | ClientError::Config { .. }
            | ClientError::Io(_) => ErrorCategory::Local,
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Unreachable => write!(f, "Backend unreachable"),
            ErrorCategory::Request => write!(f, "Request failed"),
            ErrorCategory::Transport => write!(f, "Stream interrupted"),
            ErrorCategory::Backend => write!(f, "Assistant error"),
            ErrorCategory::Local => write!(f, "Not available"),
        }
    }
}
