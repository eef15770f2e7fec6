//! Per-node prompt policy and the batch-level confirmation gate.

use softrm_core::Classification;

/// When to prompt, per the `--interactive` family of flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractiveMode {
    /// No flag given: prompt only for write-protected entries on a terminal.
    #[default]
    Auto,
    /// Never prompt.
    Never,
    /// One confirmation up front for large or recursive batches.
    Once,
    /// Prompt before every removal.
    Always,
}

/// Decides whether a removal requires confirmation, and whether the batch as
/// a whole needs one up-front gate.
#[derive(Debug, Clone, Copy)]
pub struct DispositionPolicy {
    force: bool,
    interactive: InteractiveMode,
    tty: bool,
}

impl DispositionPolicy {
    /// Build a policy from the force flag, interactive mode and the
    /// terminal-attached oracle bit.
    pub fn new(force: bool, interactive: InteractiveMode, tty: bool) -> Self {
        Self {
            force,
            interactive,
            tty,
        }
    }

    /// Per-node decision, short-circuit order: force wins, then explicit
    /// always/never, then the historical "confirm before clobbering a
    /// write-protected file" check.
    pub fn should_prompt(&self, class: &Classification) -> bool {
        if self.force {
            return false;
        }
        match self.interactive {
            InteractiveMode::Always => true,
            InteractiveMode::Never => false,
            InteractiveMode::Auto | InteractiveMode::Once => !class.writable && self.tty,
        }
    }

    /// Batch-level gate: a single confirmation covering the entire command,
    /// required in once mode for more than three targets or any recursive
    /// removal. Declining aborts the whole batch.
    pub fn requires_batch_gate(&self, target_count: usize, recursive: bool) -> bool {
        self.interactive == InteractiveMode::Once && (target_count > 3 || recursive)
    }
}
