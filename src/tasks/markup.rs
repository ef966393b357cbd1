// src/tasks/markup.rs

use tracing::info;

use crate::errors::Result;
use crate::tasks::{names, Task, TaskContext, TaskOutcome};
use crate::transform::{Chain, Inject};

pub const PAGES: &[&str] = &["pages/**/*.html"];
/// Files that inclusion markers may refer to.
pub const INCLUDE_LIBRARY: &[&str] = &["parts/**/*.html", "pages/**/*.html"];

/// Renders HTML pages, resolving `<!-- inject:PATH -->` markers against
/// partials and other pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderMarkup;

impl Task for RenderMarkup {
    fn name(&self) -> &str {
        names::RENDER_MARKUP
    }

    fn description(&self) -> &str {
        "resolve inclusion markers in pages/**/*.html"
    }

    fn run(&self, ctx: &TaskContext) -> Result<TaskOutcome> {
        let library = ctx
            .select(INCLUDE_LIBRARY)?
            .into_iter()
            .map(|file| {
                let text = ctx.fs.read_to_string(&file.path)?;
                Ok((file.rel, text))
            })
            .collect::<Result<Vec<_>>>()?;

        let pages = ctx.select(PAGES)?;
        let assets = ctx.read_assets(&pages, "pages")?;
        let rendered = Chain::new().then(Inject::new(library)).run(assets)?;

        let written = ctx.write_assets(&ctx.output_dir("pages"), &rendered)?;
        info!(task = names::RENDER_MARKUP, pages = written.len(), "pages rendered");
        ctx.reload.stream(written.iter().cloned());
        Ok(TaskOutcome::written(written.len()))
    }
}
