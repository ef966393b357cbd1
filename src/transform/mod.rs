// src/transform/mod.rs

//! Transform collaborators and the chain that applies them.
//!
//! Every leaf task is "source glob -> [`Chain`] -> destination". A chain is
//! an ordered list of [`Transform`]s; each receives the whole asset stream so
//! that stream-level steps (concatenation, sprite packing) fit the same seam
//! as per-file steps (compilation, minification).
//!
//! - [`markup`]: inclusion-marker resolution.
//! - [`styles`]: concatenation, SCSS compilation (`grass`), vendor prefixing
//!   (`lightningcss`).
//! - [`script`]: script transpilation (`oxc`).
//! - [`command`]: pipe files through an external command.
//! - [`images`]: raster re-encoding (`image`).
//! - [`svg`]: SVG minification, attribute stripping, text replacement.
//! - [`sprite`]: SVG sprite packing.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{PipelineError, Result};

pub mod command;
pub mod images;
pub mod markup;
pub mod script;
pub mod sprite;
pub mod styles;
pub mod svg;

pub use command::CommandTransform;
pub use images::ImageOptimize;
pub use markup::Inject;
pub use script::Transpile;
pub use sprite::{CssSprite, SymbolSprite};
pub use styles::{Concat, Prefix, ScssCompile};
pub use svg::{Replace, StripAttributes, SvgMinify};

/// One file flowing through a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Path relative to the task's destination directory.
    pub rel_path: PathBuf,
    pub contents: Vec<u8>,
}

impl Asset {
    pub fn new(rel_path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            rel_path: rel_path.into(),
            contents: contents.into(),
        }
    }

    /// Lower-cased extension, if any.
    pub fn extension(&self) -> Option<String> {
        self.rel_path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }

    pub fn has_extension(&self, ext: &str) -> bool {
        self.extension().as_deref() == Some(ext)
    }

    /// Contents as UTF-8 text, or a transform error naming `stage`.
    pub fn text(&self, stage: &'static str) -> Result<&str> {
        std::str::from_utf8(&self.contents).map_err(|e| {
            PipelineError::transform(stage, &self.rel_path, format!("not valid UTF-8: {e}"))
        })
    }

    /// Copy of this asset with new contents.
    pub fn with_contents(&self, contents: impl Into<Vec<u8>>) -> Self {
        Self::new(self.rel_path.clone(), contents)
    }
}

/// A transform collaborator.
pub trait Transform: Send + Sync + Debug {
    /// Short stage name for logs and errors.
    fn name(&self) -> &'static str;

    fn apply(&self, assets: Vec<Asset>) -> Result<Vec<Asset>>;
}

/// Apply `f` to every asset, keeping order.
pub fn map_each<F>(assets: Vec<Asset>, mut f: F) -> Result<Vec<Asset>>
where
    F: FnMut(Asset) -> Result<Asset>,
{
    assets.into_iter().map(&mut f).collect()
}

/// Ordered list of transforms. Order is part of correctness: e.g. the
/// colorized sprite must strip attributes before packing.
#[derive(Debug, Default)]
pub struct Chain {
    stages: Vec<Box<dyn Transform>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, stage: impl Transform + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Stage names in order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn run(&self, mut assets: Vec<Asset>) -> Result<Vec<Asset>> {
        for stage in &self.stages {
            debug!(stage = stage.name(), assets = assets.len(), "applying transform");
            assets = stage.apply(assets)?;
        }
        Ok(assets)
    }
}

/// Join `rel` onto `base` using forward-slash components.
pub(crate) fn join_rel(base: &Path, rel: &str) -> PathBuf {
    rel.split('/')
        .filter(|c| !c.is_empty())
        .fold(base.to_path_buf(), |acc, c| acc.join(c))
}
