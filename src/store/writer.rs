//! Writing attachment payloads into the flat output directory.
//!
//! Files are never overwritten. A payload is written to a temporary file
//! inside the output directory and then linked into place under its
//! target name, so a reader never sees a half-written attachment.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{GrabError, Result};

/// Result of a write attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// The payload now lives at this path.
    Written(PathBuf),
    /// Something already occupied the target name; it was left alone.
    AlreadyExists {
        path: PathBuf,
        /// Whether the existing file holds exactly the payload bytes.
        content_matches: bool,
    },
}

/// Make sure the output directory exists.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| GrabError::io(dir, e))
}

/// Write `data` to `dir/name` unless that name is already taken.
///
/// `hash` is the payload's content hash; it is only used to report
/// whether a pre-existing file has the same content.
pub fn write_new_file(dir: &Path, name: &str, data: &[u8], hash: &str) -> Result<WriteResult> {
    let target = dir.join(name);

    if target.exists() {
        return Ok(already_exists(target, hash));
    }

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| GrabError::store(&target, e))?;
    tmp.write_all(data)
        .map_err(|e| GrabError::store(&target, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| GrabError::store(&target, e))?;

    match tmp.persist_noclobber(&target) {
        Ok(_) => {
            debug!(path = %target.display(), bytes = data.len(), "Wrote attachment");
            Ok(WriteResult::Written(target))
        }
        // Someone else created the name between the check and the link.
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
            Ok(already_exists(target, hash))
        }
        Err(e) => Err(GrabError::store(&target, e.error)),
    }
}

fn already_exists(path: PathBuf, hash: &str) -> WriteResult {
    let content_matches = match file_hash(&path) {
        Ok(existing) => existing == hash,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Could not hash existing file");
            false
        }
    };
    WriteResult::AlreadyExists {
        path,
        content_matches,
    }
}

/// Hex SHA-256 of a file's contents, streamed.
pub fn file_hash(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| GrabError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).map_err(|e| GrabError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::registry::content_hash;

    #[test]
    fn test_write_then_exists() {
        let dir = tempfile::tempdir().unwrap();
        let hash = content_hash(b"payload");

        let first = write_new_file(dir.path(), "a.bin", b"payload", &hash).unwrap();
        assert_eq!(first, WriteResult::Written(dir.path().join("a.bin")));
        assert_eq!(std::fs::read(dir.path().join("a.bin")).unwrap(), b"payload");

        let second = write_new_file(dir.path(), "a.bin", b"payload", &hash).unwrap();
        assert_eq!(
            second,
            WriteResult::AlreadyExists {
                path: dir.path().join("a.bin"),
                content_matches: true,
            }
        );
    }

    #[test]
    fn test_existing_file_with_other_content_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.bin"), b"older").unwrap();

        let hash = content_hash(b"newer");
        let result = write_new_file(dir.path(), "a.bin", b"newer", &hash).unwrap();
        assert!(matches!(
            result,
            WriteResult::AlreadyExists {
                content_matches: false,
                ..
            }
        ));
        assert_eq!(std::fs::read(dir.path().join("a.bin")).unwrap(), b"older");
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let hash = content_hash(b"x");
        write_new_file(dir.path(), "x.txt", b"x", &hash).unwrap();
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("x.txt")]);
    }

    #[test]
    fn test_missing_directory_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let hash = content_hash(b"x");
        let err = write_new_file(&missing, "x.txt", b"x", &hash).unwrap_err();
        assert!(matches!(err, GrabError::Store { .. }));
    }

    #[test]
    fn test_file_hash_matches_content_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(file_hash(&path).unwrap(), content_hash(b"abc"));
    }
}
