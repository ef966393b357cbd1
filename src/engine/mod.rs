// src/engine/mod.rs

//! Orchestration engine for sitepipe.
//!
//! This module ties together:
//! - the run sequence (which tasks run, in what order)
//! - the composer that executes a sequence or a single task
//! - the watch-mode runtime event loop that reacts to:
//!   - file-watch triggers
//!   - shutdown signals
//!
//! Ordering semantics live in [`sequence`] and [`composer`]; the async
//! watch-mode shell is implemented in [`runtime`].

use crate::watch::WatchAction;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Events flowing into the watch runtime.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A watch binding matched a changed path.
    ActionTriggered {
        binding: String,
        action: WatchAction,
        /// First matching path, relative to the source root.
        path: String,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod composer;
pub mod runtime;
pub mod sequence;

pub use composer::{Composer, RunReport};
pub use runtime::Runtime;
pub use sequence::{RunSequence, Step};
