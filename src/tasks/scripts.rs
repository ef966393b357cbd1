// src/tasks/scripts.rs

use tracing::info;

use crate::errors::Result;
use crate::tasks::{names, Task, TaskContext, TaskOutcome};
use crate::transform::{Chain, CommandTransform, Transpile};

pub const SOURCES: &[&str] = &["pages/**/*.js"];

/// Transpiles page scripts down to the configured target, or through the
/// configured command when one is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderScripts;

impl Task for RenderScripts {
    fn name(&self) -> &str {
        names::RENDER_SCRIPTS
    }

    fn description(&self) -> &str {
        "transpile pages/**/*.js"
    }

    fn run(&self, ctx: &TaskContext) -> Result<TaskOutcome> {
        let files = ctx.select(SOURCES)?;
        let assets = ctx.read_assets(&files, "pages")?;
        let settings = ctx.config.scripts();
        let command = CommandTransform::new("transpile", settings.transpile_cmd.clone());
        let chain = if command.command().is_some() {
            Chain::new().then(command)
        } else {
            Chain::new().then(Transpile::new(&settings.target)?)
        };
        let out = chain.run(assets)?;

        let written = ctx.write_assets(&ctx.output_dir("pages"), &out)?;
        info!(task = names::RENDER_SCRIPTS, scripts = written.len(), "scripts rendered");
        ctx.reload.stream(written.iter().cloned());
        Ok(TaskOutcome::written(written.len()))
    }
}
