//! Error types for a plunger run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlungerError {
    /// Connecting, TLS, login or folder selection failed. Ends the run.
    #[error("authentication error: {0}")]
    Auth(String),
    /// The mailbox search itself failed. Ends the run.
    #[error("search error: {0}")]
    Search(String),
    /// The IMAP connection dropped mid-session. Ends the run.
    #[error("mailbox connection lost: {0}")]
    Disconnected(String),
    /// A single message could not be retrieved.
    #[error("failed to fetch message {id}: {reason}")]
    Fetch { id: String, reason: String },
    /// A single message could not be decoded.
    #[error("failed to decode message {id}: {reason}")]
    Decode { id: String, reason: String },
    /// The link was refused before any request was made.
    #[error("refusing to visit {link}: {reason}")]
    InvalidLink { link: String, reason: String },
    /// Transport level failure (DNS, connect, timeout, bad URL).
    #[error("request to {link} failed: {source}")]
    Request {
        link: String,
        #[source]
        source: reqwest::Error,
    },
    /// Reading the operator's answer failed.
    #[error("prompt error: {0}")]
    Prompt(#[from] std::io::Error),
    /// Writing the result artifact failed.
    #[error("failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PlungerError>;

impl PlungerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors that must stop the whole run rather than a single item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Auth(_)
                | Self::Search(_)
                | Self::Disconnected(_)
                | Self::Prompt(_)
                | Self::Io { .. }
        )
    }
}
