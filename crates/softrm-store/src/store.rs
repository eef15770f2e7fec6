//! The holding-area store: intern, restore, list, evict, purge.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

use softrm_core::{BinConfig, Confirm};

use crate::compress;
use crate::entry::{self, Entry};
use crate::error::StoreError;
use crate::relocate::{self, RelocateMode};

/// Name of the metadata directory under the holding-area root.
pub const METADATA_DIR: &str = ".metadata";

/// The recycle bin: stored payloads at the root, one JSON metadata record
/// per entry under `.metadata/`.
///
/// Configuration is threaded in at construction; there is no ambient global
/// state. Every read of metadata is defensive: records left half-written by
/// a crashed instance are skipped, never fatal.
#[derive(Debug, Clone)]
pub struct RecycleStore {
    root: PathBuf,
    retention_days: u32,
    max_size_bytes: u64,
}

/// Result of a successful intern.
#[derive(Debug)]
pub struct InternOutcome {
    /// The committed metadata record.
    pub entry: Entry,
    /// Where the payload now lives.
    pub stored_path: PathBuf,
    /// Which relocation strategy succeeded.
    pub mode: RelocateMode,
    /// Entries evicted by the capacity pre-check.
    pub evicted: usize,
    /// The bin was still over its size cap after eviction; interning
    /// proceeded anyway (best-effort capacity management, not a quota).
    pub over_capacity: bool,
}

/// Result of a restore request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The entry is live again at this path; its record is gone.
    Restored(PathBuf),
    /// The destination existed and the overwrite prompt was declined.
    Cancelled,
}

/// Result of a purge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeOutcome {
    /// Every payload and record removed; count of payloads.
    Purged(usize),
    /// The confirmation was declined; nothing touched.
    Cancelled,
}

impl RecycleStore {
    /// Open the holding area described by `config`, creating the root and
    /// metadata directories if needed.
    pub fn open(config: &BinConfig) -> Result<Self, StoreError> {
        let root = config.recycle_bin_path.clone();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
        let meta_dir = root.join(METADATA_DIR);
        fs::create_dir_all(&meta_dir).map_err(|e| StoreError::io(&meta_dir, e))?;

        Ok(Self {
            root,
            retention_days: config.retention_days,
            max_size_bytes: config.max_size_bytes(),
        })
    }

    /// Holding-area root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn metadata_dir(&self) -> PathBuf {
        self.root.join(METADATA_DIR)
    }

    fn metadata_path(&self, stored_name: &str) -> PathBuf {
        self.metadata_dir().join(format!("{stored_name}.json"))
    }

    /// Relocate the entry at `path` into the holding area and commit its
    /// metadata record.
    ///
    /// Symlinks are interned as the link itself. Regular files are gzip
    /// compressed after relocation; on compression failure the uncompressed
    /// payload is kept under a non-`.gz` stored name. The metadata record is
    /// committed last, via temp-write + atomic rename; if that commit fails
    /// the relocated payload is removed again so this call never leaves an
    /// unmatched payload behind.
    pub fn intern(&self, path: &Path) -> Result<InternOutcome, StoreError> {
        let abs = std::path::absolute(path).map_err(|e| StoreError::io(path, e))?;
        let meta = fs::symlink_metadata(&abs).map_err(|e| StoreError::io(&abs, e))?;
        let file_type = meta.file_type();
        let is_directory = file_type.is_dir();
        // Only regular files take the gzip path; compressing a symlink would
        // capture its target instead of the link.
        let compressible = file_type.is_file();

        let mut evicted = 0;
        let mut over_capacity = false;
        if self.payload_size() > self.max_size_bytes {
            tracing::warn!(
                "recycle bin at {} is over its size cap, evicting oldest entries",
                self.root.display()
            );
            evicted = self.evict_to_capacity();
            over_capacity = self.payload_size() > self.max_size_bytes;
            if over_capacity {
                tracing::warn!("recycle bin still over its size cap after eviction");
            }
        }

        let deleted_at = Utc::now();
        let mut stored = entry::stored_name(&abs, deleted_at, compressible);
        let mut dest = self.root.join(&stored);

        let mode = relocate::relocate(&abs, &dest, is_directory)?;

        let mut is_compressed = false;
        let mut compressed_size = None;
        if compressible {
            match compress_in_place(&dest) {
                Ok(size) => {
                    is_compressed = true;
                    compressed_size = Some(size);
                }
                Err(e) => {
                    tracing::warn!(
                        "compression of {} failed ({e}); keeping uncompressed payload",
                        dest.display()
                    );
                    let plain = entry::stored_name(&abs, deleted_at, false);
                    let plain_dest = self.root.join(&plain);
                    match fs::rename(&dest, &plain_dest) {
                        Ok(()) => {
                            stored = plain;
                            dest = plain_dest;
                        }
                        // Keep the `.gz` name; the record below says
                        // uncompressed, so restore still moves bytes as-is.
                        Err(rename_err) => {
                            tracing::warn!(
                                "could not drop .gz suffix from {}: {rename_err}",
                                dest.display()
                            );
                        }
                    }
                }
            }
        }

        let entry = Entry {
            original_path: abs,
            deleted_at,
            stored_name: stored,
            is_compressed,
            original_size: meta.len(),
            compressed_size,
            is_directory,
        };

        if let Err(e) = self.commit_metadata(&entry) {
            // Roll back the uncommitted side: a payload with no record must
            // not be left behind by this call.
            let _ = remove_any(&dest);
            return Err(e);
        }

        Ok(InternOutcome {
            stored_path: dest,
            entry,
            mode,
            evicted,
            over_capacity,
        })
    }

    /// Serialize the entry to a temporary sibling, then atomically rename it
    /// to its final metadata path. Only after the rename is the intern
    /// considered complete.
    fn commit_metadata(&self, entry: &Entry) -> Result<(), StoreError> {
        let final_path = self.metadata_path(&entry.stored_name);
        let tmp_path = sibling_tmp(&final_path);

        let data = serde_json::to_vec_pretty(entry).map_err(|source| StoreError::Metadata {
            path: final_path.clone(),
            source,
        })?;
        fs::write(&tmp_path, &data).map_err(|e| StoreError::io(&tmp_path, e))?;

        if let Err(e) = fs::rename(&tmp_path, &final_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(StoreError::io(&final_path, e));
        }
        Ok(())
    }

    /// Restore a held entry to its recorded original path.
    ///
    /// The selector is the exact recorded path, or a bare filename when it
    /// matches exactly one held entry. An existing destination requires
    /// confirmation through the oracle; declining cancels with no side
    /// effects. The metadata record is removed only after the payload is
    /// back in place, so a failed restore stays retryable.
    pub fn restore(
        &self,
        selector: &str,
        confirm: &mut dyn Confirm,
    ) -> Result<RestoreOutcome, StoreError> {
        let entry = self.find_entry(selector)?;

        // Safety check against corrupted or malicious metadata, independent
        // of how the record was produced.
        let dest = normalize_lexical(&entry.original_path);
        if !dest.is_absolute() || has_parent_component(&dest) {
            return Err(StoreError::InvalidRestorePath {
                path: entry.original_path.clone(),
            });
        }

        if fs::symlink_metadata(&dest).is_ok() {
            let prompt = format!("'{}' already exists. Overwrite?", dest.display());
            if !confirm.confirm(&prompt) {
                return Ok(RestoreOutcome::Cancelled);
            }
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let stored_path = self.root.join(&entry.stored_name);
        if entry.is_compressed && !entry.is_directory {
            compress::decompress_file(&stored_path, &dest)
                .map_err(|e| StoreError::io(&stored_path, e))?;
            if let Err(e) = fs::remove_file(&stored_path) {
                tracing::warn!(
                    "restored {} but could not remove stored payload: {e}",
                    dest.display()
                );
            }
        } else {
            match relocate::relocate(&stored_path, &dest, entry.is_directory) {
                Ok(_) => {}
                Err(StoreError::SourceRemoval { path, source }) => {
                    tracing::warn!(
                        "restored {} but could not remove stored payload {}: {source}",
                        dest.display(),
                        path.display()
                    );
                }
                Err(e) => return Err(e),
            }
        }

        // The entry is live again; only now drop its record.
        let meta_path = self.metadata_path(&entry.stored_name);
        fs::remove_file(&meta_path).map_err(|e| StoreError::io(&meta_path, e))?;

        Ok(RestoreOutcome::Restored(dest))
    }

    fn find_entry(&self, selector: &str) -> Result<Entry, StoreError> {
        let selector_path = Path::new(selector);
        let mut base_matches: Vec<Entry> = Vec::new();

        for entry in self.entries()? {
            if entry.original_path == selector_path {
                return Ok(entry);
            }
            if entry.original_path.file_name() == Some(OsStr::new(selector)) {
                base_matches.push(entry);
            }
        }

        match base_matches.len() {
            0 => Err(StoreError::NotFound {
                selector: selector.to_string(),
            }),
            1 => Ok(base_matches.remove(0)),
            count => Err(StoreError::Ambiguous {
                selector: selector.to_string(),
                count,
            }),
        }
    }

    /// Lazy, restartable iterator over held entries. Records that cannot be
    /// read or parsed are skipped, never fatal.
    pub fn entries(&self) -> Result<Entries, StoreError> {
        let meta_dir = self.metadata_dir();
        let inner = fs::read_dir(&meta_dir).map_err(|e| StoreError::io(&meta_dir, e))?;
        Ok(Entries { inner })
    }

    /// Age-based eviction pass using the configured retention period.
    pub fn evict_expired(&self) -> usize {
        let cutoff = Utc::now() - Duration::days(i64::from(self.retention_days));
        self.evict_older_than(cutoff)
    }

    /// Remove payload and record of every entry deleted before `cutoff`.
    ///
    /// Failures on individual entries are logged and do not stop the pass.
    /// Returns the number of entries removed.
    pub fn evict_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let Ok(entries) = self.entries() else {
            return 0;
        };

        let mut removed = 0;
        for entry in entries {
            if entry.deleted_at >= cutoff {
                continue;
            }
            match self.remove_entry(&entry) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!("failed to evict {}: {e}", entry.stored_name),
            }
        }
        removed
    }

    /// Oldest-first eviction until the aggregate payload size is back under
    /// the cap, or nothing remains. Returns the number of entries removed.
    fn evict_to_capacity(&self) -> usize {
        let Ok(entries) = self.entries() else {
            return 0;
        };
        let mut all: Vec<Entry> = entries.collect();
        all.sort_by_key(|e| e.deleted_at);

        let mut total = self.payload_size();
        let mut removed = 0;
        for entry in all {
            if total <= self.max_size_bytes {
                break;
            }
            let size = path_size(&self.root.join(&entry.stored_name));
            match self.remove_entry(&entry) {
                Ok(()) => {
                    removed += 1;
                    total = total.saturating_sub(size);
                }
                Err(e) => tracing::warn!("failed to evict {}: {e}", entry.stored_name),
            }
        }
        removed
    }

    /// Remove every payload and every metadata record after an explicit
    /// confirmation. Returns the number of payloads removed.
    pub fn purge(&self, confirm: &mut dyn Confirm) -> Result<PurgeOutcome, StoreError> {
        if !confirm.confirm("Permanently delete all items from the recycle bin?") {
            return Ok(PurgeOutcome::Cancelled);
        }

        let read = fs::read_dir(&self.root).map_err(|e| StoreError::io(&self.root, e))?;
        let mut removed = 0;
        for dir_entry in read.flatten() {
            if dir_entry.file_name() == METADATA_DIR {
                continue;
            }
            let path = dir_entry.path();
            match remove_any(&path) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!("failed to purge {}: {e}", path.display()),
            }
        }

        let meta_dir = self.metadata_dir();
        fs::remove_dir_all(&meta_dir).map_err(|e| StoreError::io(&meta_dir, e))?;
        fs::create_dir_all(&meta_dir).map_err(|e| StoreError::io(&meta_dir, e))?;

        Ok(PurgeOutcome::Purged(removed))
    }

    /// Aggregate on-disk size of stored payloads, metadata excluded.
    pub fn payload_size(&self) -> u64 {
        let Ok(read) = fs::read_dir(&self.root) else {
            return 0;
        };
        read.flatten()
            .filter(|e| e.file_name() != METADATA_DIR)
            .map(|e| path_size(&e.path()))
            .sum()
    }

    /// Remove one entry's payload and record. A missing payload (orphaned
    /// metadata from an earlier crash) is tolerated.
    fn remove_entry(&self, entry: &Entry) -> Result<(), StoreError> {
        let stored = self.root.join(&entry.stored_name);
        match remove_any(&stored) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(&stored, e)),
        }

        let meta_path = self.metadata_path(&entry.stored_name);
        match fs::remove_file(&meta_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&meta_path, e)),
        }
    }
}

/// Lazy iterator over held entries; see [`RecycleStore::entries`].
#[derive(Debug)]
pub struct Entries {
    inner: fs::ReadDir,
}

impl Iterator for Entries {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        loop {
            let dir_entry = match self.inner.next()? {
                Ok(e) => e,
                Err(_) => continue,
            };
            let path = dir_entry.path();
            if path.extension() != Some(OsStr::new("json")) {
                continue;
            }

            let parsed = fs::read(&path)
                .ok()
                .and_then(|data| serde_json::from_slice::<Entry>(&data).ok());
            match parsed {
                Some(entry) => return Some(entry),
                None => {
                    tracing::debug!("skipping unreadable metadata record {}", path.display());
                }
            }
        }
    }
}

/// Compress a relocated payload in place: encode into a temporary sibling,
/// then atomically rename it over the stored payload.
fn compress_in_place(dest: &Path) -> io::Result<u64> {
    let tmp = sibling_tmp(dest);
    match compress::compress_file(dest, &tmp) {
        Ok(size) => {
            fs::rename(&tmp, dest)?;
            Ok(size)
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}

fn sibling_tmp(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}

fn remove_any(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Recursive lstat-based size of a payload.
fn path_size(path: &Path) -> u64 {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return 0;
    };
    if !meta.is_dir() {
        return meta.len();
    }
    let Ok(read) = fs::read_dir(path) else {
        return 0;
    };
    read.flatten().map(|e| path_size(&e.path())).sum()
}

/// Lexical path normalization: `.` components are dropped, `..` pops the
/// previous component. A `..` at the very start (nothing to pop) is kept so
/// the caller can reject it; a `..` at the root is dropped, matching how the
/// filesystem treats it.
fn normalize_lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && out.as_os_str().is_empty() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

fn has_parent_component(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::ParentDir))
}
