//! Remote mailbox access.
//!
//! The extractor only needs four things from a mail server: select a
//! label, search it, fetch raw messages, and let go of the session. The
//! [`Mailbox`] trait captures exactly that so the run driver can be
//! exercised without a network.

pub mod imap;
pub mod local;

use std::fmt;

use crate::error::Result;

/// Server-assigned message identifier (an IMAP sequence number).
pub type MessageId = u32;

/// Gmail's "has an attachment" search, the default query.
pub const HAS_ATTACHMENT_QUERY: &str = "X-GM-RAW \"has:attachment\"";

/// An authenticated session against a remote mailbox.
pub trait Mailbox {
    /// Names of all folders/labels of the account.
    fn list_folders(&mut self) -> Result<Vec<String>>;

    /// Select a folder/label; returns the number of messages it holds.
    fn select(&mut self, label: &str) -> Result<u32>;

    /// Run a search over the selected folder, ids in ascending order.
    fn search(&mut self, query: &str) -> Result<Vec<MessageId>>;

    /// Fetch the complete raw RFC 822 bytes of one message.
    fn fetch_raw(&mut self, id: MessageId) -> Result<Vec<u8>>;

    /// Release the session.
    fn logout(&mut self) -> Result<()>;
}

/// Login credentials, held only in memory for the life of the process.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    secret: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_hides_secret() {
        let creds = Credentials::new("me@example.com", "hunter2");
        let shown = format!("{creds:?}");
        assert!(shown.contains("me@example.com"));
        assert!(!shown.contains("hunter2"));
        assert_eq!(creds.secret(), "hunter2");
    }
}
