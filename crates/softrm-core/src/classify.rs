//! Filesystem entry classification.
//!
//! A read-only probe over `lstat` results: what kind of entry a path is and
//! whether the invoking identity may write to it. Symlinks are classified as
//! the link itself, never followed.

use std::fs::Metadata;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Kind of filesystem entry, as reported by `lstat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
    /// Block or character device.
    Device,
    /// Named pipe (FIFO).
    Pipe,
    /// Unix domain socket.
    Socket,
    /// Anything else the platform reports.
    Other,
}

impl EntryKind {
    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File)
    }

    fn from_file_type(file_type: std::fs::FileType) -> Self {
        if file_type.is_dir() {
            return Self::Directory;
        }
        if file_type.is_symlink() {
            return Self::Symlink;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            if file_type.is_block_device() || file_type.is_char_device() {
                return Self::Device;
            }
            if file_type.is_fifo() {
                return Self::Pipe;
            }
            if file_type.is_socket() {
                return Self::Socket;
            }
        }

        if file_type.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }
}

/// Live classification of a single filesystem entry.
#[derive(Debug, Clone)]
pub struct Classification {
    /// What the entry is.
    pub kind: EntryKind,
    /// Size in bytes from `lstat` (inode size for directories).
    pub size: u64,
    /// Whether the effective identity holds the applicable write bit.
    pub writable: bool,
}

impl Classification {
    /// Probe `path` without following symlinks.
    pub fn of(path: &Path) -> io::Result<Self> {
        let meta = std::fs::symlink_metadata(path)?;
        Ok(Self::from_metadata(&meta))
    }

    /// Build a classification from an already-fetched `lstat` result.
    pub fn from_metadata(meta: &Metadata) -> Self {
        Self {
            kind: EntryKind::from_file_type(meta.file_type()),
            size: meta.len(),
            writable: is_writable(meta),
        }
    }

    /// Check if the classified entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Human description of the entry, used in removal prompts.
    pub fn description(&self) -> &'static str {
        match self.kind {
            EntryKind::Directory => "directory",
            EntryKind::Symlink => "symbolic link",
            EntryKind::Device => "device file",
            EntryKind::Pipe => "named pipe",
            EntryKind::Socket => "socket",
            EntryKind::File | EntryKind::Other => {
                if self.writable {
                    "regular file"
                } else {
                    "write-protected regular file"
                }
            }
        }
    }
}

/// Write-bit check against the process's effective uid/gid: owner bit when
/// the entry is ours, group bit when we share its group, other bit otherwise.
#[cfg(unix)]
fn is_writable(meta: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;

    let mode = meta.mode();
    let euid = unsafe { libc::geteuid() };
    let egid = unsafe { libc::getegid() };

    if meta.uid() == euid {
        mode & 0o200 != 0
    } else if meta.gid() == egid {
        mode & 0o020 != 0
    } else {
        mode & 0o002 != 0
    }
}

#[cfg(not(unix))]
fn is_writable(_meta: &Metadata) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.txt");
        std::fs::write(&path, b"data").unwrap();

        let class = Classification::of(&path).unwrap();
        assert_eq!(class.kind, EntryKind::File);
        assert_eq!(class.size, 4);
        assert!(class.writable);
        assert_eq!(class.description(), "regular file");
    }

    #[test]
    fn test_classify_directory() {
        let dir = tempfile::tempdir().unwrap();
        let class = Classification::of(dir.path()).unwrap();
        assert!(class.is_dir());
        assert_eq!(class.description(), "directory");
    }

    #[cfg(unix)]
    #[test]
    fn test_classify_symlink_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target.txt");
        let link = dir.path().join("link");
        std::fs::write(&target, b"data").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let class = Classification::of(&link).unwrap();
        assert_eq!(class.kind, EntryKind::Symlink);
        assert_eq!(class.description(), "symbolic link");
    }

    #[cfg(unix)]
    #[test]
    fn test_write_protected_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readonly.txt");
        std::fs::write(&path, b"data").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o444)).unwrap();

        let class = Classification::of(&path).unwrap();
        assert!(!class.writable);
        assert_eq!(class.description(), "write-protected regular file");
    }

    #[test]
    fn test_missing_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Classification::of(&dir.path().join("absent")).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
