//! Persisted recycle bin entry records.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One held item: the durable record pairing a stored payload with the
/// location it was removed from.
///
/// The JSON field names are the on-disk metadata format and must not change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Absolute path at the time of removal.
    pub original_path: PathBuf,
    /// When the entry was interned (RFC3339 on the wire).
    pub deleted_at: DateTime<Utc>,
    /// Unique name of the payload inside the holding area.
    pub stored_name: String,
    /// Whether the payload is a gzip stream.
    pub is_compressed: bool,
    /// Size reported by `lstat` at intern time.
    pub original_size: u64,
    /// On-disk size of the compressed payload; absent when no compression
    /// was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed_size: Option<u64>,
    /// Whether the payload is a whole directory.
    pub is_directory: bool,
}

impl Entry {
    /// File name of this entry's metadata record.
    pub fn metadata_file_name(&self) -> String {
        format!("{}.json", self.stored_name)
    }
}

/// Eight hex characters of a blake3 hash over the path bytes.
///
/// Collision resistance across same-second, same-basename interns is the
/// goal, not security: two different absolute paths hash apart.
pub fn short_path_hash(path: &Path) -> String {
    let hash = blake3::hash(path.as_os_str().as_encoded_bytes());
    hash.to_hex()[..8].to_string()
}

/// Build the stored name for a payload: second-resolution timestamp, short
/// path hash, base name, and a `.gz` suffix when the payload will be
/// compressed.
pub fn stored_name(abs_path: &Path, deleted_at: DateTime<Utc>, compressed: bool) -> String {
    let stamp = deleted_at.format("%Y%m%d_%H%M%S");
    let hash = short_path_hash(abs_path);
    let base = abs_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string());

    if compressed {
        format!("{stamp}_{hash}_{base}.gz")
    } else {
        format!("{stamp}_{hash}_{base}")
    }
}
