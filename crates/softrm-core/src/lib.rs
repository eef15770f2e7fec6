//! Core types shared by the softrm crates.
//!
//! Classification of filesystem entries, recycle bin configuration, and the
//! injectable confirmation oracle.

pub mod classify;
pub mod config;
pub mod confirm;

pub use classify::{Classification, EntryKind};
pub use config::{BinConfig, ConfigError, DEFAULT_MAX_SIZE_MB, DEFAULT_RETENTION_DAYS};
pub use confirm::Confirm;
