//! The attachment extractor: raw message in, files on disk out.
//!
//! For each candidate part of a message, in document order:
//!
//! 1. drop it if the extension filter rejects the filename,
//! 2. drop it if the payload decoded to nothing,
//! 3. hash the payload and ask the [`FilenameRegistry`] whether this
//!    content was already stored under the filename,
//! 4. pick `name.ext` for the first distinct content and `name(n).ext`
//!    for the n-th,
//! 5. write it unless the target name is already taken on disk.
//!
//! Only a message that cannot be parsed produces an error; every
//! per-part problem becomes an [`Outcome`] and processing continues.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::error::{GrabError, Result};
use crate::model::attachment::{AttachmentCandidate, Payload};
use crate::model::outcome::{Action, Outcome};
use crate::parser::filename::{occurrence_name, ExtensionFilter};
use crate::parser::mime;
use crate::store::registry::{content_hash, FilenameRegistry, Registration};
use crate::store::writer::{self, WriteResult};

/// Stateful extractor for one run.
///
/// Owns the registry, so every message of a run must go through the same
/// instance, in a fixed order, for suffix numbering to be reproducible.
#[derive(Debug)]
pub struct Extractor {
    output_dir: PathBuf,
    filter: ExtensionFilter,
    registry: FilenameRegistry,
}

impl Extractor {
    /// Create an extractor writing into `output_dir`, creating it if needed.
    pub fn new(output_dir: impl Into<PathBuf>, filter: ExtensionFilter) -> Result<Self> {
        let output_dir = output_dir.into();
        writer::ensure_dir(&output_dir)?;
        Ok(Self {
            output_dir,
            filter,
            registry: FilenameRegistry::new(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn filter(&self) -> &ExtensionFilter {
        &self.filter
    }

    pub fn registry(&self) -> &FilenameRegistry {
        &self.registry
    }

    /// Extract every attachment of one raw message.
    ///
    /// Returns one outcome per candidate part, in document order.
    pub fn process_message(&mut self, raw_message: &[u8]) -> Result<Vec<Outcome>> {
        let candidates = mime::parse_candidates(raw_message)?;
        debug!(count = candidates.len(), "Attachment candidates found");
        Ok(candidates
            .iter()
            .map(|candidate| self.handle_candidate(candidate))
            .collect())
    }

    /// Run a single candidate through filter, dedup, naming and storage.
    pub fn handle_candidate(&mut self, candidate: &AttachmentCandidate) -> Outcome {
        let filename = candidate.filename.clone();
        if candidate.declared_name != filename {
            debug!(
                declared = ?candidate.declared_name,
                filename = %filename,
                "Declared filename sanitised"
            );
        }

        if !self.filter.accepts(&filename) {
            debug!(filename = %filename, "Filtered out by extension");
            return Outcome {
                filename,
                hash: None,
                size: 0,
                action: Action::FilteredOut,
            };
        }

        let data = match &candidate.payload {
            Payload::Bytes(data) => data,
            Payload::Empty => {
                warn!(
                    filename = %filename,
                    content_type = %candidate.content_type,
                    "Attachment has an empty payload, skipping"
                );
                return skipped(filename, Action::SkippedEmpty);
            }
            Payload::Undecodable => {
                let err = GrabError::PayloadDecode {
                    filename: filename.clone(),
                };
                warn!(error = %err, "Skipping attachment");
                return skipped(filename, Action::SkippedUndecodable);
            }
        };

        let hash = content_hash(data);
        let size = data.len() as u64;

        let occurrence = match self.registry.register(&filename, &hash) {
            Registration::Duplicate => {
                info!(filename = %filename, "Skipping duplicate file");
                return Outcome {
                    filename,
                    hash: Some(hash),
                    size,
                    action: Action::SkippedDuplicate,
                };
            }
            Registration::New { occurrence } => occurrence,
        };

        let target_name = occurrence_name(&filename, occurrence);
        let action = match writer::write_new_file(&self.output_dir, &target_name, data, &hash) {
            Ok(WriteResult::Written(path)) if occurrence > 1 => {
                info!(filename = %filename, path = %path.display(), "Renamed and stored");
                Action::Renamed { path }
            }
            Ok(WriteResult::Written(path)) => {
                info!(path = %path.display(), "Stored");
                Action::Stored { path }
            }
            Ok(WriteResult::AlreadyExists {
                path,
                content_matches,
            }) => {
                if content_matches {
                    info!(path = %path.display(), "Exists in destination");
                } else {
                    warn!(
                        path = %path.display(),
                        "Exists in destination with different content, not overwriting"
                    );
                }
                Action::SkippedExists {
                    path,
                    content_matches,
                }
            }
            Err(e) => {
                error!(error = %e, "Could not store attachment");
                let path = match &e {
                    GrabError::Store { path, .. } | GrabError::Io { path, .. } => path.clone(),
                    _ => self.output_dir.join(&target_name),
                };
                Action::Failed {
                    path,
                    reason: e.to_string(),
                }
            }
        };

        Outcome {
            filename,
            hash: Some(hash),
            size,
            action,
        }
    }
}

fn skipped(filename: String, action: Action) -> Outcome {
    Outcome {
        filename,
        hash: None,
        size: 0,
        action,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, data: &[u8]) -> AttachmentCandidate {
        AttachmentCandidate {
            part_index: 0,
            declared_name: name.to_string(),
            filename: name.to_string(),
            content_type: "application/octet-stream".into(),
            payload: if data.is_empty() {
                Payload::Empty
            } else {
                Payload::Bytes(data.to_vec())
            },
        }
    }

    #[test]
    fn test_collision_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let mut ex = Extractor::new(dir.path(), ExtensionFilter::accept_all()).unwrap();

        let a = ex.handle_candidate(&candidate("a.txt", b"X"));
        let b = ex.handle_candidate(&candidate("a.txt", b"Y"));
        let c = ex.handle_candidate(&candidate("a.txt", b"X"));

        assert_eq!(a.action, Action::Stored { path: dir.path().join("a.txt") });
        assert_eq!(b.action, Action::Renamed { path: dir.path().join("a(2).txt") });
        assert_eq!(c.action, Action::SkippedDuplicate);
        assert_eq!(std::fs::read(dir.path().join("a(2).txt")).unwrap(), b"Y");
    }

    #[test]
    fn test_filtered_candidate_leaves_registry_alone() {
        let dir = tempfile::tempdir().unwrap();
        let filter = ExtensionFilter::new([".jpg", ".gif"]);
        let mut ex = Extractor::new(dir.path(), filter).unwrap();

        let txt = ex.handle_candidate(&candidate("notes.txt", b"hi"));
        let jpg = ex.handle_candidate(&candidate("photo.JPG", b"img"));

        assert_eq!(txt.action, Action::FilteredOut);
        assert_eq!(ex.registry().occurrences("notes.txt"), 0);
        assert!(jpg.action.wrote_file());
        assert_eq!(ex.registry().occurrences("photo.JPG"), 1);
    }

    #[test]
    fn test_empty_payload_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut ex = Extractor::new(dir.path(), ExtensionFilter::accept_all()).unwrap();

        let out = ex.handle_candidate(&candidate("empty.bin", b""));
        assert_eq!(out.action, Action::SkippedEmpty);
        assert!(ex.registry().is_empty());
        assert!(!dir.path().join("empty.bin").exists());
    }

    #[test]
    fn test_undecodable_payload_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut ex = Extractor::new(dir.path(), ExtensionFilter::accept_all()).unwrap();

        let mut broken = candidate("broken.bin", b"x");
        broken.payload = Payload::Undecodable;
        assert_eq!(
            ex.handle_candidate(&broken).action,
            Action::SkippedUndecodable
        );
        assert!(ex.registry().is_empty());
    }

    #[test]
    fn test_creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("attachments");
        let ex = Extractor::new(&out, ExtensionFilter::accept_all()).unwrap();
        assert!(out.is_dir());
        assert_eq!(ex.output_dir(), out.as_path());
    }
}
