// src/tasks/styles.rs

use std::path::Path;

use tracing::{error, info};

use crate::errors::{PipelineError, Result};
use crate::tasks::{names, Task, TaskContext, TaskOutcome};
use crate::transform::{Chain, Concat, Prefix, ScssCompile};

/// Concatenation order: variables first, then global styles, then
/// page and partial styles.
pub const SOURCES: &[&str] = &[
    "styles/**/_variables.scss",
    "styles/**/*.scss",
    "pages/**/*.scss",
    "parts/**/*.scss",
];

/// Compiles every SCSS file into one stylesheet under `<output>/styles/`.
///
/// A compile error is reported and leaves the previous stylesheet in place;
/// the task then ends `Degraded` instead of failing the run. A written
/// stylesheet is streamed to connected browsers for in-place injection.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderStyles;

impl Task for RenderStyles {
    fn name(&self) -> &str {
        names::RENDER_STYLES
    }

    fn description(&self) -> &str {
        "concatenate, compile and prefix all SCSS into styles/<output_name>"
    }

    fn run(&self, ctx: &TaskContext) -> Result<TaskOutcome> {
        let settings = ctx.config.styles();
        let files = ctx.select(SOURCES)?;
        let assets = ctx.read_assets(&files, "")?;

        let bundle = Path::new(&settings.output_name).with_extension("scss");
        let compile = Chain::new()
            .then(Concat::new(bundle))
            .then(ScssCompile::new().with_load_path(ctx.source_root().join("styles")));

        let compiled = match compile.run(assets) {
            Ok(css) => css,
            Err(PipelineError::Transform { stage: "scss", path, message }) => {
                error!(task = names::RENDER_STYLES, ?path, "{message}");
                return Ok(TaskOutcome::Degraded { reason: message });
            }
            Err(other) => return Err(other),
        };

        let finished = if settings.prefix {
            Chain::new().then(Prefix::legacy_browsers()).run(compiled)?
        } else {
            compiled
        };

        // The bundle is named after the configured output, whatever
        // extension the compiler gave it.
        let finished: Vec<_> = finished
            .into_iter()
            .map(|mut asset| {
                asset.rel_path = settings.output_name.clone().into();
                asset
            })
            .collect();

        let written = ctx.write_assets(&ctx.output_dir("styles"), &finished)?;
        info!(task = names::RENDER_STYLES, files = files.len(), "styles rendered");
        ctx.reload.stream(written.iter().cloned());
        Ok(TaskOutcome::written(written.len()))
    }
}
