//! IMAP over TLS, backed by the `imap` and `native-tls` crates.

use std::net::TcpStream;

use ::imap::Session;
use native_tls::{TlsConnector, TlsStream};
use tracing::{debug, info, warn};

use crate::config::ImapConfig;
use crate::error::{GrabError, Result};
use crate::mailbox::{Credentials, Mailbox, MessageId};

/// A logged-in IMAP session.
pub struct ImapMailbox {
    session: Session<TlsStream<TcpStream>>,
    host: String,
    port: u16,
    selected: Option<String>,
}

impl ImapMailbox {
    /// Open a TLS connection and log in.
    pub fn connect(config: &ImapConfig, credentials: &Credentials) -> Result<Self> {
        let host = config.host.as_str();
        let port = config.port;
        let connection_error = |reason: String| GrabError::Connection {
            host: host.to_string(),
            port,
            reason,
        };

        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| connection_error(e.to_string()))?;
        let client =
            ::imap::connect((host, port), host, &tls).map_err(|e| connection_error(e.to_string()))?;
        debug!(host, port, "Connected");

        let session = client
            .login(&credentials.username, credentials.secret())
            .map_err(|(e, _client)| GrabError::Authentication {
                username: credentials.username.clone(),
                reason: e.to_string(),
            })?;
        info!(host, username = %credentials.username, "Logged in");

        Ok(Self {
            session,
            host: host.to_string(),
            port,
            selected: None,
        })
    }
}

impl Mailbox for ImapMailbox {
    fn list_folders(&mut self) -> Result<Vec<String>> {
        let names = self
            .session
            .list(Some(""), Some("*"))
            .map_err(|e| GrabError::FolderSelection {
                label: "*".into(),
                reason: e.to_string(),
            })?;
        Ok(names.iter().map(|n| n.name().to_string()).collect())
    }

    fn select(&mut self, label: &str) -> Result<u32> {
        let mailbox = self
            .session
            .select(label)
            .map_err(|e| GrabError::FolderSelection {
                label: label.to_string(),
                reason: e.to_string(),
            })?;
        self.selected = Some(label.to_string());
        debug!(label, exists = mailbox.exists, "Selected folder");
        Ok(mailbox.exists)
    }

    fn search(&mut self, query: &str) -> Result<Vec<MessageId>> {
        let hits = self.session.search(query).map_err(|e| GrabError::Search {
            query: query.to_string(),
            reason: e.to_string(),
        })?;
        let mut ids: Vec<MessageId> = hits.into_iter().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn fetch_raw(&mut self, id: MessageId) -> Result<Vec<u8>> {
        let fetches = self
            .session
            .fetch(id.to_string(), "RFC822")
            .map_err(|e| GrabError::Fetch {
                id,
                reason: e.to_string(),
            })?;
        fetches
            .iter()
            .find_map(|f| f.body())
            .map(|body| body.to_vec())
            .ok_or_else(|| GrabError::Fetch {
                id,
                reason: "server returned no message body".into(),
            })
    }

    fn logout(&mut self) -> Result<()> {
        if let Some(label) = self.selected.take() {
            if let Err(e) = self.session.close() {
                warn!(label = %label, error = %e, "CLOSE failed");
            }
        }
        self.session.logout().map_err(|e| GrabError::Connection {
            host: self.host.clone(),
            port: self.port,
            reason: format!("logout failed: {e}"),
        })?;
        debug!("Logged out");
        Ok(())
    }
}
