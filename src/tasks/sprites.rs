// src/tasks/sprites.rs

//! Icon sprite tasks.
//!
//! Both write the sprite at the output root and its stylesheet under
//! `<output>/styles/`.

use tracing::info;

use crate::errors::Result;
use crate::tasks::{names, Task, TaskContext, TaskOutcome};
use crate::transform::{Chain, CssSprite, Replace, StripAttributes, SvgMinify, SymbolSprite};

pub const UNCHANGED_DIR: &str = "img/svg-sprites/unchanged";
pub const UNCHANGED_SOURCES: &[&str] = &["img/svg-sprites/unchanged/**/*.svg"];
pub const COLORIZED_DIR: &str = "img/svg-sprites/colorized";
pub const COLORIZED_SOURCES: &[&str] = &["img/svg-sprites/colorized/**/*.svg"];

/// Icons kept as drawn, packed into a background-position sprite.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpriteUnchanged;

impl Task for SpriteUnchanged {
    fn name(&self) -> &str {
        names::SPRITE_UNCHANGED
    }

    fn description(&self) -> &str {
        "pack img/svg-sprites/unchanged into sprite-unchanged.svg"
    }

    fn run(&self, ctx: &TaskContext) -> Result<TaskOutcome> {
        let sprites = ctx.config.sprites();
        let files = ctx.select(UNCHANGED_SOURCES)?;
        let icons = ctx.read_assets(&files, UNCHANGED_DIR)?;

        let out = Chain::new()
            .then(SvgMinify::pretty())
            .then(CssSprite::new(sprites.padding, sprites.unchanged_prefix.clone()))
            .run(icons)?;

        let written = ctx.write_assets(ctx.output_root(), &out)?;
        info!(task = names::SPRITE_UNCHANGED, icons = files.len(), "sprite built");
        Ok(TaskOutcome::written(written.len()))
    }
}

/// Icons recoloured from CSS: `fill` and `style` are stripped before
/// packing into a `<symbol>` sprite.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpriteColorized;

impl Task for SpriteColorized {
    fn name(&self) -> &str {
        names::SPRITE_COLORIZED
    }

    fn description(&self) -> &str {
        "strip fill/style from img/svg-sprites/colorized and pack into sprite.svg"
    }

    fn run(&self, ctx: &TaskContext) -> Result<TaskOutcome> {
        let sprites = ctx.config.sprites();
        let files = ctx.select(COLORIZED_SOURCES)?;
        let icons = ctx.read_assets(&files, COLORIZED_DIR)?;

        let out = Chain::new()
            .then(SvgMinify::pretty())
            .then(StripAttributes::recolourable())
            .then(Replace::unescape_gt())
            .then(SymbolSprite::new(sprites.padding, sprites.colorized_prefix.clone()))
            .run(icons)?;

        let written = ctx.write_assets(ctx.output_root(), &out)?;
        info!(task = names::SPRITE_COLORIZED, icons = files.len(), "sprite built");
        Ok(TaskOutcome::written(written.len()))
    }
}
