// src/watch/mod.rs

//! Watch-mode dispatch: bindings from source globs to actions, and the
//! `notify` watcher that feeds them.

pub mod bindings;
pub mod watcher;

pub use bindings::{FiredBinding, WatchAction, WatchBinding, WatchTable};
pub use watcher::{spawn_watcher, WatcherHandle};
