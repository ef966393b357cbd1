// src/tasks/mod.rs

//! Leaf tasks and the registry that names them.
//!
//! Every leaf task is "select sources -> transform chain -> write to the
//! output tree", optionally followed by a live-reload notification. Tasks
//! hold no state between runs; everything they need comes in through the
//! [`TaskContext`].

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::PipelineConfig;
use crate::engine::TaskName;
use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;
use crate::patterns::{collect_matching_files, relative_str, GlobPattern, SourceFile};
use crate::server::ReloadHandle;
use crate::transform::{join_rel, Asset};

pub mod clean;
pub mod images;
pub mod markup;
pub mod scripts;
pub mod sprites;
pub mod styles;

pub use clean::CleanOutput;
pub use images::RenderImages;
pub use markup::RenderMarkup;
pub use scripts::RenderScripts;
pub use sprites::{SpriteColorized, SpriteUnchanged};
pub use styles::RenderStyles;

/// Registered task names.
pub mod names {
    pub const CLEAN_OUTPUT: &str = "clean-output";
    pub const RENDER_MARKUP: &str = "render-markup";
    pub const RENDER_STYLES: &str = "render-styles";
    pub const RENDER_SCRIPTS: &str = "render-scripts";
    pub const RENDER_IMAGES: &str = "render-images";
    pub const SPRITE_UNCHANGED: &str = "sprite-unchanged";
    pub const SPRITE_COLORIZED: &str = "sprite-colorized";
}

/// Everything a task needs to run.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub config: Arc<PipelineConfig>,
    pub fs: Arc<dyn FileSystem>,
    pub reload: ReloadHandle,
}

impl TaskContext {
    pub fn new(config: PipelineConfig, fs: Arc<dyn FileSystem>, reload: ReloadHandle) -> Self {
        Self {
            config: Arc::new(config),
            fs,
            reload,
        }
    }

    pub fn source_root(&self) -> &Path {
        self.config.source_root()
    }

    pub fn output_root(&self) -> &Path {
        self.config.output_root()
    }

    /// Source files selected by `patterns`, in selection order.
    pub fn select(&self, patterns: &[&str]) -> Result<Vec<SourceFile>> {
        let pattern = GlobPattern::new(patterns)?;
        collect_matching_files(self.fs.as_ref(), self.source_root(), &pattern)
    }

    /// Read selected files as assets, with paths relative to `base`
    /// (a source-relative directory such as `pages`).
    pub fn read_assets(&self, files: &[SourceFile], base: &str) -> Result<Vec<Asset>> {
        files
            .iter()
            .map(|file| {
                let contents = self.fs.read(&file.path)?;
                Ok(Asset::new(rebase(&file.rel, base), contents))
            })
            .collect()
    }

    /// Write assets under `dest` and return the written paths relative to
    /// the output root.
    pub fn write_assets(&self, dest: &Path, assets: &[Asset]) -> Result<Vec<String>> {
        let mut written = Vec::with_capacity(assets.len());
        for asset in assets {
            let target = dest.join(&asset.rel_path);
            self.fs.write(&target, &asset.contents)?;
            debug!(path = ?target, bytes = asset.contents.len(), "wrote output");
            written.push(
                relative_str(self.output_root(), &target)
                    .unwrap_or_else(|| target.to_string_lossy().replace('\\', "/")),
            );
        }
        Ok(written)
    }

    /// `<output>/<rel>`.
    pub fn output_dir(&self, rel: &str) -> PathBuf {
        join_rel(self.output_root(), rel)
    }
}

/// Strip a leading `base/` from a source-relative path.
pub fn rebase(rel: &str, base: &str) -> PathBuf {
    let base = base.trim_end_matches('/');
    let stripped = rel
        .strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(rel);
    join_rel(Path::new(""), stripped)
}

/// How a task ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Outputs written.
    Success { written: usize },
    /// The task reported a problem and wrote nothing; the run continues.
    Degraded { reason: String },
}

impl TaskOutcome {
    pub fn written(n: usize) -> Self {
        TaskOutcome::Success { written: n }
    }
}

/// A named unit of work.
pub trait Task: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// One-line summary for `list`.
    fn description(&self) -> &str {
        ""
    }

    fn run(&self, ctx: &TaskContext) -> Result<TaskOutcome>;
}

/// Name -> task lookup.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskName, Arc<dyn Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in leaf task.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(CleanOutput);
        registry.register(RenderMarkup);
        registry.register(RenderStyles);
        registry.register(RenderScripts);
        registry.register(RenderImages);
        registry.register(SpriteUnchanged);
        registry.register(SpriteColorized);
        registry
    }

    /// Register a task under its own name, replacing any previous one.
    pub fn register(&mut self, task: impl Task + 'static) {
        self.register_arc(Arc::new(task));
    }

    pub fn register_arc(&mut self, task: Arc<dyn Task>) {
        self.tasks.insert(task.name().to_string(), task);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Task>> {
        self.tasks
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::TaskNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Task>)> {
        self.tasks.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
