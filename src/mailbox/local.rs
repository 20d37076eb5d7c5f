//! A mailbox made of `.eml` files on disk.
//!
//! Lets the extractor run offline over saved messages. Every file counts
//! as one message; identifiers are 1-based positions in the file list, so
//! processing order is the order the files were given in.

use std::path::PathBuf;

use crate::error::{GrabError, Result};
use crate::mailbox::{Mailbox, MessageId};

/// Folder name reported by [`LocalMailbox::list_folders`].
pub const LOCAL_FOLDER: &str = "local";

/// Read-only mailbox over a fixed list of message files.
#[derive(Debug, Clone)]
pub struct LocalMailbox {
    files: Vec<PathBuf>,
}

impl LocalMailbox {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }

    fn path_of(&self, id: MessageId) -> Option<&PathBuf> {
        let idx = usize::try_from(id).ok()?.checked_sub(1)?;
        self.files.get(idx)
    }
}

impl Mailbox for LocalMailbox {
    fn list_folders(&mut self) -> Result<Vec<String>> {
        Ok(vec![LOCAL_FOLDER.to_string()])
    }

    fn select(&mut self, _label: &str) -> Result<u32> {
        Ok(self.files.len() as u32)
    }

    /// Every file matches; attachment detection happens in the extractor.
    fn search(&mut self, _query: &str) -> Result<Vec<MessageId>> {
        Ok((1..=self.files.len() as u32).collect())
    }

    fn fetch_raw(&mut self, id: MessageId) -> Result<Vec<u8>> {
        let path = self.path_of(id).ok_or_else(|| GrabError::Fetch {
            id,
            reason: "no such message".into(),
        })?;
        std::fs::read(path).map_err(|e| GrabError::Fetch {
            id,
            reason: format!("{}: {e}", path.display()),
        })
    }

    fn logout(&mut self) -> Result<()> {
        Ok(())
    }
}
