//! Per-attachment actions and the run summary built from them.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// What happened to one attachment candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Written under its own (sanitised) name.
    Stored { path: PathBuf },
    /// Written under a `name(n).ext` variant because other content already owns the name.
    Renamed { path: PathBuf },
    /// Same content was already recorded under this filename during the run.
    SkippedDuplicate,
    /// The target name is already taken on disk; nothing was overwritten.
    SkippedExists {
        path: PathBuf,
        /// Whether the file on disk holds the same bytes as this attachment.
        content_matches: bool,
    },
    /// The extension filter rejected the filename.
    FilteredOut,
    /// The payload decoded to nothing.
    SkippedEmpty,
    /// The transfer encoding was broken, so there are no bytes to store.
    SkippedUndecodable,
    /// The filesystem rejected the write.
    Failed { path: PathBuf, reason: String },
}

impl Action {
    /// Short label used in log lines and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Stored { .. } => "stored",
            Self::Renamed { .. } => "renamed",
            Self::SkippedDuplicate => "duplicate",
            Self::SkippedExists { .. } => "exists",
            Self::FilteredOut => "filtered",
            Self::SkippedEmpty => "empty",
            Self::SkippedUndecodable => "undecodable",
            Self::Failed { .. } => "failed",
        }
    }

    /// Whether a new file landed on disk.
    pub fn wrote_file(&self) -> bool {
        matches!(self, Self::Stored { .. } | Self::Renamed { .. })
    }
}

/// The result of handling one candidate part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// Sanitised declared filename.
    pub filename: String,
    /// Hex content hash, when the payload got that far.
    pub hash: Option<String>,
    /// Decoded payload size in bytes.
    pub size: u64,
    #[serde(flatten)]
    pub action: Action,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            Action::Stored { path } => write!(f, "Storing: {}", path.display()),
            Action::Renamed { path } => {
                write!(f, "Renaming and storing: {} to {}", self.filename, path.display())
            }
            Action::SkippedDuplicate => write!(f, "Skipping duplicate file: {}", self.filename),
            Action::SkippedExists { path, .. } => {
                write!(f, "Exists in destination: {}", path.display())
            }
            Action::FilteredOut => write!(f, "Filtered out: {}", self.filename),
            Action::SkippedEmpty => write!(f, "Empty payload, skipping: {}", self.filename),
            Action::SkippedUndecodable => {
                write!(f, "Undecodable payload, skipping: {}", self.filename)
            }
            Action::Failed { path, reason } => {
                write!(f, "Could not store: {} ({reason})", path.display())
            }
        }
    }
}

/// Totals for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Identifiers returned by the search.
    pub messages_found: usize,
    /// Messages fetched and parsed.
    pub messages_processed: usize,
    /// Messages that could not be fetched or parsed.
    pub messages_failed: usize,
    pub stored: usize,
    pub renamed: usize,
    pub duplicates: usize,
    pub exists: usize,
    /// Subset of `exists` where the file on disk differs from the attachment.
    pub exists_conflicting: usize,
    pub filtered: usize,
    pub empty: usize,
    pub undecodable: usize,
    pub failed: usize,
    /// Bytes written to new files.
    pub bytes_written: u64,
}

impl RunSummary {
    /// Fold one outcome into the totals.
    pub fn record(&mut self, outcome: &Outcome) {
        match &outcome.action {
            Action::Stored { .. } => self.stored += 1,
            Action::Renamed { .. } => self.renamed += 1,
            Action::SkippedDuplicate => self.duplicates += 1,
            Action::SkippedExists {
                content_matches, ..
            } => {
                self.exists += 1;
                if !content_matches {
                    self.exists_conflicting += 1;
                }
            }
            Action::FilteredOut => self.filtered += 1,
            Action::SkippedEmpty => self.empty += 1,
            Action::SkippedUndecodable => self.undecodable += 1,
            Action::Failed { .. } => self.failed += 1,
        }
        if outcome.action.wrote_file() {
            self.bytes_written += outcome.size;
        }
    }

    /// Number of new files written.
    pub fn files_written(&self) -> usize {
        self.stored + self.renamed
    }
}
