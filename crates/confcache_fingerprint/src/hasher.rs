//! File content hashing for the default host.
//!
//! Computes XXH3-128 hashes of single files and aggregate fingerprints of
//! declared file sets. A missing file is an answer (`None`), not an error;
//! any other I/O failure is, because the check cannot be trusted without it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use confcache_common::{ContentHash, ContentHasher};

use crate::error::FingerprintError;
use crate::input::FileSet;

/// Marker folded into a file set fingerprint for a root that does not exist.
const MISSING_ROOT: &str = "<missing>";

/// Utility for hashing files and file sets.
pub struct FileHasher;

impl FileHasher {
    /// Computes the content hash of a file, `None` if it does not exist.
    ///
    /// A directory hashes to the sorted list of its entry names, so adding or
    /// removing a child changes the hash while child content does not.
    pub fn hash_file(path: &Path) -> Result<Option<ContentHash>, FingerprintError> {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(FingerprintError::io(path, e)),
        };
        if metadata.is_dir() {
            let mut names = Vec::new();
            for entry in std::fs::read_dir(path).map_err(|e| FingerprintError::io(path, e))? {
                let entry = entry.map_err(|e| FingerprintError::io(path, e))?;
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
            names.sort();
            let mut hasher = ContentHasher::new();
            for name in &names {
                hasher.put_str(name);
            }
            return Ok(Some(hasher.finish()));
        }
        match std::fs::read(path) {
            Ok(content) => Ok(Some(ContentHash::from_bytes(&content))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FingerprintError::io(path, e)),
        }
    }

    /// Computes the aggregate fingerprint of a declared file set.
    ///
    /// Relative roots are resolved against `base`. Roots are visited in
    /// declaration order; files below a directory root are visited in sorted
    /// order and contribute their path relative to that root plus their hash.
    pub fn fingerprint_file_set(base: &Path, file_set: &FileSet) -> Result<ContentHash, FingerprintError> {
        let mut hasher = ContentHasher::new();
        for root in &file_set.roots {
            hasher.put_str(&root.to_string_lossy());
            let resolved = base.join(root);
            let metadata = match std::fs::metadata(&resolved) {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    hasher.put_str(MISSING_ROOT);
                    continue;
                }
                Err(e) => return Err(FingerprintError::io(resolved, e)),
            };
            if metadata.is_dir() {
                let mut files = Vec::new();
                walk_dir(&resolved, &mut files)?;
                files.sort();
                for file in &files {
                    let relative = file.strip_prefix(&resolved).unwrap_or(file);
                    hasher.put_str(&relative.to_string_lossy());
                    Self::put_file(&mut hasher, file)?;
                }
            } else {
                Self::put_file(&mut hasher, &resolved)?;
            }
        }
        Ok(hasher.finish())
    }

    fn put_file(hasher: &mut ContentHasher, path: &Path) -> Result<(), FingerprintError> {
        match Self::hash_file(path)? {
            Some(hash) => hasher.put_hash(&hash),
            None => hasher.put_str(MISSING_ROOT),
        };
        Ok(())
    }
}

/// Collects the files below `dir`. Symbolic links are not followed: a link to a
/// directory is collected like a file and contributes its target's listing.
fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), FingerprintError> {
    for entry in std::fs::read_dir(dir).map_err(|e| FingerprintError::io(dir, e))? {
        let entry = entry.map_err(|e| FingerprintError::io(dir, e))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| FingerprintError::io(&path, e))?;
        if file_type.is_dir() {
            walk_dir(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}
