//! Recycle bin holding-area store for softrm.
//!
//! Owns the on-disk layout of the recycle bin: stored payloads at the root,
//! one JSON metadata record per entry under `.metadata/`. Interning relocates
//! an entry into the holding area (rename, falling back to copy+remove),
//! compresses regular files, and commits metadata atomically; restore,
//! listing, eviction and purge operate on the committed records.

mod compress;
mod entry;
mod error;
mod relocate;
mod store;

pub use compress::{compress_file, decompress_file};
pub use entry::{Entry, short_path_hash, stored_name};
pub use error::StoreError;
pub use relocate::{RelocateMode, relocate, relocate_with};
pub use store::{
    Entries, InternOutcome, METADATA_DIR, PurgeOutcome, RecycleStore, RestoreOutcome,
};
