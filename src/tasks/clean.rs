// src/tasks/clean.rs

use tracing::info;

use crate::errors::Result;
use crate::tasks::{names, Task, TaskContext, TaskOutcome};

/// Empties the output directory and removes the legacy staging directory.
///
/// The output directory itself is kept (a dev server may be rooted at it).
/// Missing directories are fine, so running this twice is the same as once.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanOutput;

impl Task for CleanOutput {
    fn name(&self) -> &str {
        names::CLEAN_OUTPUT
    }

    fn description(&self) -> &str {
        "remove everything under the output directory"
    }

    fn run(&self, ctx: &TaskContext) -> Result<TaskOutcome> {
        let fs = ctx.fs.as_ref();
        let out = ctx.output_root();
        let mut removed = 0;

        if fs.is_dir(out) {
            for entry in fs.read_dir(out)? {
                fs.remove_all(&entry)?;
                removed += 1;
            }
        }

        if let Some(legacy) = ctx.config.paths().legacy_output.as_deref() {
            if fs.exists(legacy) {
                fs.remove_all(legacy)?;
                removed += 1;
            }
        }

        info!(output = ?out, removed, "output cleaned");
        Ok(TaskOutcome::written(0))
    }
}
