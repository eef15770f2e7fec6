//! Pre-flight batch protections.
//!
//! Runs over the full target list before any mutation begins; one violation
//! fails the whole batch.

use std::path::{Component, Path, PathBuf};

use crate::error::EngineError;

/// Root, dot-directory and device-boundary protections.
#[derive(Debug, Clone, Copy)]
pub struct ProtectionGuard {
    /// Refuse to operate on `/`.
    pub preserve_root: bool,
    /// Additionally refuse any target on a different device than its parent.
    pub preserve_root_all: bool,
}

impl Default for ProtectionGuard {
    fn default() -> Self {
        Self {
            preserve_root: true,
            preserve_root_all: false,
        }
    }
}

impl ProtectionGuard {
    /// Validate the whole batch; the first violation rejects it.
    pub fn validate(&self, targets: &[PathBuf]) -> Result<(), EngineError> {
        for target in targets {
            // '.' and '..' are never valid removal targets, regardless of
            // the root-protection flags.
            if matches!(
                target.components().next_back(),
                Some(Component::CurDir | Component::ParentDir)
            ) {
                return Err(EngineError::DotComponent {
                    path: target.clone(),
                });
            }

            let Ok(abs) = std::path::absolute(target) else {
                continue;
            };

            if self.preserve_root && abs == Path::new("/") {
                return Err(EngineError::RootProtected);
            }

            if self.preserve_root_all
                && let Some(parent) = abs.parent()
                && on_different_device(&abs, parent)
            {
                return Err(EngineError::DeviceBoundary {
                    path: target.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
fn on_different_device(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (std::fs::metadata(a), std::fs::metadata(b)) {
        (Ok(ma), Ok(mb)) => ma.dev() != mb.dev(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn on_different_device(_a: &Path, _b: &Path) -> bool {
    false
}
