//! Removal engine for softrm.
//!
//! Pre-flight batch protections, the per-node prompt policy, a post-order
//! traversal abstraction, and the per-target disposal state machine that
//! routes nodes to the recycle bin or a direct unlink.

mod engine;
mod error;
mod guard;
mod policy;
mod walk;

pub use engine::{
    Disposal, DisposalObserver, RemovalEngine, RemovalOptions, RemovalOptionsBuilder,
    RemovalReport,
};
pub use error::EngineError;
pub use guard::ProtectionGuard;
pub use policy::{DispositionPolicy, InteractiveMode};
pub use walk::{PostOrderWalk, WalkNode};
