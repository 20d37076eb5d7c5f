//! Centralized error types for mailgrab.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailgrab library.
///
/// Only [`GrabError::is_fatal`] variants abort a run; everything that
/// happens after a message list has been obtained is logged and skipped.
#[derive(Error, Debug)]
pub enum GrabError {
    /// TCP or TLS setup with the mail server failed.
    #[error("Could not connect to {host}:{port}: {reason}")]
    Connection {
        host: String,
        port: u16,
        reason: String,
    },

    /// The server rejected the supplied credentials.
    #[error("Authentication failed for '{username}': {reason}")]
    Authentication { username: String, reason: String },

    /// The requested label does not exist or is inaccessible.
    #[error("Could not select folder '{label}': {reason}")]
    FolderSelection { label: String, reason: String },

    /// The search over the selected folder failed.
    #[error("Search '{query}' failed: {reason}")]
    Search { query: String, reason: String },

    /// A single message could not be fetched.
    #[error("Could not fetch message {id}: {reason}")]
    Fetch { id: u32, reason: String },

    /// The raw bytes of a message are not a usable MIME structure.
    #[error("MIME parse error: {0}")]
    Parse(String),

    /// A part's payload decoded to nothing usable.
    #[error("Payload of '{filename}' could not be decoded")]
    PayloadDecode { filename: String },

    /// The filesystem rejected an attachment write.
    #[error("Could not store '{path}' (invalid name or path under {platform}): {source}")]
    Store {
        path: PathBuf,
        platform: &'static str,
        source: std::io::Error,
    },

    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias for `Result<T, GrabError>`.
pub type Result<T> = std::result::Result<T, GrabError>;

impl GrabError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `Store` variant, tagging it with the host platform.
    pub fn store(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Store {
            path: path.into(),
            platform: std::env::consts::OS,
            source,
        }
    }

    /// Whether this error ends the whole run rather than a single message or part.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::Authentication { .. }
                | Self::FolderSelection { .. }
                | Self::Search { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let auth = GrabError::Authentication {
            username: "me".into(),
            reason: "nope".into(),
        };
        assert!(auth.is_fatal());

        let fetch = GrabError::Fetch {
            id: 7,
            reason: "gone".into(),
        };
        assert!(!fetch.is_fatal());
        assert!(!GrabError::Parse("bad".into()).is_fatal());
    }

    #[test]
    fn test_store_error_names_platform() {
        let err = GrabError::store(
            "attachments/a:b.txt",
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "bad name"),
        );
        let msg = err.to_string();
        assert!(msg.contains("a:b.txt"));
        assert!(msg.contains(std::env::consts::OS));
    }
}
