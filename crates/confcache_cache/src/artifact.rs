//! Content-addressed storage of project model artifacts.
//!
//! Each [`ProjectModel`] is stored as `<dir>/<key>.model`, where the key is the
//! hash of the encoded model. Every file starts with a header holding magic
//! bytes, the format version, the tool version, and a payload checksum.

use std::path::{Path, PathBuf};

use confcache_common::ContentHash;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CacheError;
use crate::model::ProjectModel;

/// Magic bytes identifying a stored project model.
const MODEL_MAGIC: [u8; 4] = *b"CCMD";

/// Current model artifact format version.
const MODEL_FORMAT_VERSION: u32 = 1;

/// File extension of model artifacts.
const MODEL_EXT: &str = "model";

/// Header prepended to every model artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ModelHeader {
    magic: [u8; 4],
    format_version: u32,
    tool_version: String,
    checksum: ContentHash,
}

/// Store for project model artifacts of one cache entry.
pub struct ModelStore {
    dir: PathBuf,
    tool_version: String,
}

impl ModelStore {
    /// Creates a store in `dir` for artifacts written by `tool_version`.
    pub fn new(dir: &Path, tool_version: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            tool_version: tool_version.to_string(),
        }
    }

    /// Returns the file path of the artifact with the given key.
    pub fn artifact_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{MODEL_EXT}"))
    }

    /// Writes `model` and returns its key.
    pub fn write_model(&self, model: &ProjectModel) -> Result<String, CacheError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;

        let payload = encode(model)?;
        let checksum = ContentHash::from_bytes(&payload);
        let key = checksum.to_string();
        let header = ModelHeader {
            magic: MODEL_MAGIC,
            format_version: MODEL_FORMAT_VERSION,
            tool_version: self.tool_version.clone(),
            checksum,
        };
        let header_bytes = encode(&header)?;

        // 4-byte header length (little-endian) + header + payload
        let header_len = header_bytes.len() as u32;
        let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
        output.extend_from_slice(&header_len.to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(&payload);

        let path = self.artifact_path(&key);
        std::fs::write(&path, &output).map_err(|e| CacheError::io(path, e))?;
        Ok(key)
    }

    /// Reads the model stored under `key`.
    ///
    /// Returns `None` if the file is missing, its header does not match this
    /// store, or the payload fails its checksum. Corruption is a cache miss.
    pub fn read_model(&self, key: &str) -> Option<ProjectModel> {
        let path = self.artifact_path(key);
        let raw = std::fs::read(&path).ok()?;
        if raw.len() < 4 {
            return None;
        }
        let header_len = u32::from_le_bytes(raw[..4].try_into().ok()?) as usize;
        let body = raw.get(4..)?;
        let header_bytes = body.get(..header_len)?;
        let payload = &body[header_len..];

        let (header, _): (ModelHeader, usize) =
            bincode::serde::decode_from_slice(header_bytes, bincode::config::standard()).ok()?;
        if header.magic != MODEL_MAGIC || header.format_version != MODEL_FORMAT_VERSION {
            debug!("{} has an unsupported header", path.display());
            return None;
        }
        if header.tool_version != self.tool_version {
            debug!(
                "{} was written by version {}",
                path.display(),
                header.tool_version
            );
            return None;
        }
        if ContentHash::from_bytes(payload) != header.checksum {
            debug!("{} failed its checksum", path.display());
            return None;
        }
        bincode::serde::decode_from_slice(payload, bincode::config::standard())
            .ok()
            .map(|(model, _)| model)
    }

    /// Removes artifacts whose key is not in `live_keys`.
    ///
    /// Returns the number of files removed.
    pub fn gc(&self, live_keys: &[&str]) -> Result<usize, CacheError> {
        if !self.dir.exists() {
            return Ok(0);
        }
        let mut removed = 0;
        let entries = std::fs::read_dir(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| CacheError::io(&self.dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(MODEL_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !live_keys.contains(&stem) {
                    std::fs::remove_file(&path).map_err(|e| CacheError::io(&path, e))?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CacheError> {
    bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(|e| {
        CacheError::Serialization {
            reason: e.to_string(),
        }
    })
}
