//! The removal engine: per-target state machine and reporting.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use derive_builder::Builder;

use softrm_core::{Classification, Confirm};
use softrm_store::RecycleStore;

use crate::error::EngineError;
use crate::guard::ProtectionGuard;
use crate::policy::{DispositionPolicy, InteractiveMode};
use crate::walk::PostOrderWalk;

/// How a single node was disposed of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposal {
    /// Moved into the recycle bin.
    Recycled,
    /// Permanently unlinked.
    Removed,
    /// A denied prompt left the node in place.
    Skipped,
}

/// Callback invoked after each node disposition (verbose reporting lives in
/// the binary, not here).
pub type DisposalObserver<'a> = &'a mut dyn FnMut(&Path, Disposal);

/// Options for a removal run.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct RemovalOptions {
    /// Ignore nonexistent targets, never prompt.
    #[builder(default = "false")]
    pub force: bool,

    /// Prompt mode.
    #[builder(default)]
    pub interactive: InteractiveMode,

    /// Remove directories and their contents.
    #[builder(default = "false")]
    pub recursive: bool,

    /// Remove empty directories without recursion.
    #[builder(default = "false")]
    pub dir_mode: bool,

    /// Prune subtrees on a different file system during recursion.
    #[builder(default = "false")]
    pub one_file_system: bool,

    /// Refuse to operate on `/`.
    #[builder(default = "true")]
    pub preserve_root: bool,

    /// Additionally refuse targets on a different device than their parent.
    #[builder(default = "false")]
    pub preserve_root_all: bool,

    /// Whether the process is attached to an interactive terminal. Supplied
    /// by the caller; the engine never probes stdin itself.
    #[builder(default = "false")]
    pub tty: bool,
}

impl RemovalOptions {
    /// Create a new options builder.
    pub fn builder() -> RemovalOptionsBuilder {
        RemovalOptionsBuilder::default()
    }
}

impl Default for RemovalOptions {
    fn default() -> Self {
        Self {
            force: false,
            interactive: InteractiveMode::default(),
            recursive: false,
            dir_mode: false,
            one_file_system: false,
            preserve_root: true,
            preserve_root_all: false,
            tty: false,
        }
    }
}

/// Final accounting for one engine run.
#[derive(Debug, Default)]
pub struct RemovalReport {
    /// Targets fully disposed.
    pub succeeded: usize,
    /// Targets that failed.
    pub failed: usize,
    /// Nodes left in place by denied prompts.
    pub skipped: usize,
    /// The batch-level gate was declined before any disposal.
    pub aborted: bool,
    /// Per-target failures, in command-line order.
    pub errors: Vec<(PathBuf, EngineError)>,
}

impl RemovalReport {
    /// Whether every requested target was disposed (the process exit code).
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Orchestrates removal of a batch of targets.
///
/// Consults the prompt policy per node and routes disposals either to the
/// recycle bin store (when one is supplied) or to a direct unlink. All
/// interaction happens through the injected [`Confirm`] oracle and the
/// optional observer; the engine itself never touches stdin or stdout.
pub struct RemovalEngine<'a> {
    options: RemovalOptions,
    policy: DispositionPolicy,
    guard: ProtectionGuard,
    store: Option<&'a RecycleStore>,
    confirm: &'a mut dyn Confirm,
    observer: Option<DisposalObserver<'a>>,
}

impl<'a> RemovalEngine<'a> {
    /// Create an engine. Passing `None` for the store selects permanent
    /// removal for every disposal.
    pub fn new(
        options: RemovalOptions,
        store: Option<&'a RecycleStore>,
        confirm: &'a mut dyn Confirm,
    ) -> Self {
        let policy = DispositionPolicy::new(options.force, options.interactive, options.tty);
        let guard = ProtectionGuard {
            preserve_root: options.preserve_root,
            preserve_root_all: options.preserve_root_all,
        };
        Self {
            options,
            policy,
            guard,
            store,
            confirm,
            observer: None,
        }
    }

    /// Attach a disposition observer (used for verbose output).
    pub fn with_observer(mut self, observer: DisposalObserver<'a>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Dispose of each target in command-line order.
    ///
    /// Guard violations abort the whole batch before any mutation. A
    /// declined batch gate aborts cleanly (`aborted` set, nothing failed).
    /// Per-target failures are recorded and the loop continues.
    pub fn remove_all(&mut self, targets: &[PathBuf]) -> Result<RemovalReport, EngineError> {
        self.guard.validate(targets)?;

        let mut report = RemovalReport::default();

        if self
            .policy
            .requires_batch_gate(targets.len(), self.options.recursive)
        {
            let prompt = if self.options.recursive {
                "remove all arguments recursively?".to_string()
            } else {
                format!("remove {} arguments?", targets.len())
            };
            if !self.confirm.confirm(&prompt) {
                report.aborted = true;
                return Ok(report);
            }
        }

        for target in targets {
            match self.remove_target(target, &mut report) {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    report.failed += 1;
                    report.errors.push((target.clone(), e));
                }
            }
        }

        Ok(report)
    }

    fn remove_target(
        &mut self,
        target: &Path,
        report: &mut RemovalReport,
    ) -> Result<(), EngineError> {
        let meta = match fs::symlink_metadata(target) {
            Ok(m) => m,
            // Nonexistent under force is a silent no-op.
            Err(e) if e.kind() == io::ErrorKind::NotFound && self.options.force => return Ok(()),
            Err(e) => return Err(EngineError::io(target, e)),
        };
        let class = Classification::from_metadata(&meta);

        if class.is_dir() {
            self.remove_directory(target, class, report)
        } else {
            self.dispose_node(target, &class, report).map(|_| ())
        }
    }

    fn remove_directory(
        &mut self,
        path: &Path,
        class: Classification,
        report: &mut RemovalReport,
    ) -> Result<(), EngineError> {
        if !self.options.recursive {
            if !self.options.dir_mode {
                return Err(EngineError::IsADirectory {
                    path: path.to_path_buf(),
                });
            }
            if !is_dir_empty(path) {
                return Err(EngineError::DirectoryNotEmpty {
                    path: path.to_path_buf(),
                });
            }
            return self.dispose_node(path, &class, report).map(|_| ());
        }

        self.remove_recursively(path, class, report)
    }

    fn remove_recursively(
        &mut self,
        root: &Path,
        class: Classification,
        report: &mut RemovalReport,
    ) -> Result<(), EngineError> {
        // The descend prompt gates the whole hierarchy; denial skips it all.
        if self.policy.should_prompt(&class) {
            let prompt = format!("descend into directory '{}'?", root.display());
            if !self.confirm.confirm(&prompt) {
                report.skipped += 1;
                self.notify(root, Disposal::Skipped);
                return Ok(());
            }
        }

        // With a recycle bin active the tree is interned as a single unit.
        if let Some(store) = self.store {
            store.intern(root)?;
            self.notify(root, Disposal::Recycled);
            return Ok(());
        }

        let mut first_error: Option<EngineError> = None;
        for item in PostOrderWalk::new(root, self.options.one_file_system) {
            let node = match item {
                Ok(node) => node,
                Err(e) => {
                    self.record_walk_error(&mut first_error, e);
                    continue;
                }
            };
            let class = Classification::from_metadata(&node.meta);
            let is_root = node.path == *root;

            // The root's descend prompt already covered it.
            if !is_root && self.policy.should_prompt(&class) {
                let prompt = format!(
                    "remove {} '{}'?",
                    class.description(),
                    node.path.display()
                );
                if !self.confirm.confirm(&prompt) {
                    report.skipped += 1;
                    self.notify(&node.path, Disposal::Skipped);
                    continue;
                }
            }

            if class.is_dir() {
                // A denied child leaves its directory non-empty; that is the
                // expected shape of a skip, not a target failure.
                match fs::remove_dir(&node.path) {
                    Ok(()) => self.notify(&node.path, Disposal::Removed),
                    Err(e) => tracing::debug!(
                        "could not remove directory {}: {e}",
                        node.path.display()
                    ),
                }
            } else {
                match fs::remove_file(&node.path) {
                    Ok(()) => self.notify(&node.path, Disposal::Removed),
                    Err(e) => {
                        self.record_walk_error(&mut first_error, EngineError::io(&node.path, e));
                    }
                }
            }
        }

        match first_error {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    /// Single-node disposal: prompt policy, then recycle or unlink.
    fn dispose_node(
        &mut self,
        path: &Path,
        class: &Classification,
        report: &mut RemovalReport,
    ) -> Result<Disposal, EngineError> {
        if self.policy.should_prompt(class) {
            let prompt = format!("remove {} '{}'?", class.description(), path.display());
            if !self.confirm.confirm(&prompt) {
                report.skipped += 1;
                self.notify(path, Disposal::Skipped);
                return Ok(Disposal::Skipped);
            }
        }

        let disposal = if let Some(store) = self.store {
            store.intern(path)?;
            Disposal::Recycled
        } else {
            let result = if class.is_dir() {
                fs::remove_dir(path)
            } else {
                fs::remove_file(path)
            };
            result.map_err(|e| EngineError::io(path, e))?;
            Disposal::Removed
        };

        self.notify(path, disposal);
        Ok(disposal)
    }

    fn record_walk_error(&self, first_error: &mut Option<EngineError>, err: EngineError) {
        if self.options.force && matches!(err, EngineError::NotFound { .. }) {
            return;
        }
        tracing::warn!("{err}");
        if first_error.is_none() {
            *first_error = Some(err);
        }
    }

    fn notify(&mut self, path: &Path, disposal: Disposal) {
        if let Some(observer) = self.observer.as_mut() {
            observer(path, disposal);
        }
    }
}

fn is_dir_empty(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut read| read.next().is_none())
        .unwrap_or(false)
}
