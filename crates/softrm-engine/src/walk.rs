//! Post-order traversal of a directory hierarchy.
//!
//! Yields every node deepest-first, the traversal root last, so a consumer
//! can dispose of children before their parent in a single pass. Child names
//! are sorted for deterministic order.

use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};

use crate::error::EngineError;

/// One node produced by the traversal.
#[derive(Debug)]
pub struct WalkNode {
    /// Path of the node.
    pub path: PathBuf,
    /// Its `lstat` result, fetched once on entry.
    pub meta: Metadata,
}

impl WalkNode {
    /// Check if this node is a directory.
    pub fn is_dir(&self) -> bool {
        self.meta.is_dir()
    }
}

enum Frame {
    Enter(PathBuf),
    Exit(PathBuf, Metadata),
}

/// Iterator over a hierarchy in post-order.
pub struct PostOrderWalk {
    stack: Vec<Frame>,
    root_device: Option<u64>,
}

impl PostOrderWalk {
    /// Walk the hierarchy rooted at `root`. With `same_device_only`,
    /// subtrees sitting on a different device than `root` are pruned
    /// entirely (neither visited nor yielded).
    pub fn new(root: &Path, same_device_only: bool) -> Self {
        let root_device = if same_device_only {
            device_of(root)
        } else {
            None
        };
        Self {
            stack: vec![Frame::Enter(root.to_path_buf())],
            root_device,
        }
    }
}

impl Iterator for PostOrderWalk {
    type Item = Result<WalkNode, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.stack.pop()? {
                Frame::Exit(path, meta) => return Some(Ok(WalkNode { path, meta })),
                Frame::Enter(path) => {
                    let meta = match fs::symlink_metadata(&path) {
                        Ok(m) => m,
                        Err(e) => return Some(Err(EngineError::io(&path, e))),
                    };

                    if !meta.is_dir() {
                        return Some(Ok(WalkNode { path, meta }));
                    }

                    if let Some(root_dev) = self.root_device
                        && device_of_meta(&meta) != Some(root_dev)
                    {
                        tracing::debug!(
                            "skipping {}: different file system",
                            path.display()
                        );
                        continue;
                    }

                    let mut children: Vec<PathBuf> = Vec::new();
                    let mut read_error = None;
                    match fs::read_dir(&path) {
                        Ok(read) => {
                            for child in read {
                                match child {
                                    Ok(c) => children.push(c.path()),
                                    Err(e) => read_error = Some(e),
                                }
                            }
                        }
                        Err(e) => read_error = Some(e),
                    }
                    children.sort();

                    // The directory itself is yielded after its children.
                    self.stack.push(Frame::Exit(path.clone(), meta));
                    for child in children.into_iter().rev() {
                        self.stack.push(Frame::Enter(child));
                    }

                    if let Some(e) = read_error {
                        return Some(Err(EngineError::io(&path, e)));
                    }
                }
            }
        }
    }
}

#[cfg(unix)]
fn device_of(path: &Path) -> Option<u64> {
    fs::symlink_metadata(path).ok().as_ref().and_then(device_of_meta)
}

#[cfg(unix)]
fn device_of_meta(meta: &Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(meta.dev())
}

#[cfg(not(unix))]
fn device_of(_path: &Path) -> Option<u64> {
    None
}

#[cfg(not(unix))]
fn device_of_meta(_meta: &Metadata) -> Option<u64> {
    None
}
