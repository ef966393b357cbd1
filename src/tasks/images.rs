// src/tasks/images.rs

use tracing::info;

use crate::errors::Result;
use crate::tasks::{names, Task, TaskContext, TaskOutcome};
use crate::transform::{Chain, ImageOptimize, SvgMinify};

/// Everything under `img/` except the sprite sources.
pub const SOURCES: &[&str] = &["img/**/*", "!img/svg-sprites", "!img/svg-sprites/**"];

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderImages;

impl Task for RenderImages {
    fn name(&self) -> &str {
        names::RENDER_IMAGES
    }

    fn description(&self) -> &str {
        "optimise images under img/ (sprite sources excluded)"
    }

    fn run(&self, ctx: &TaskContext) -> Result<TaskOutcome> {
        let files = ctx.select(SOURCES)?;
        let assets = ctx.read_assets(&files, "img")?;
        let out = Chain::new()
            .then(ImageOptimize::new(ctx.config.images().optimize))
            .then(SvgMinify::new())
            .run(assets)?;

        let written = ctx.write_assets(&ctx.output_dir("img"), &out)?;
        info!(task = names::RENDER_IMAGES, images = written.len(), "images rendered");
        ctx.reload.stream(written.iter().cloned());
        Ok(TaskOutcome::written(written.len()))
    }
}
