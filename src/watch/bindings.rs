// src/watch/bindings.rs

//! Watch bindings: which changed paths trigger which action.

use std::fmt;

use crate::engine::TaskName;
use crate::errors::Result;
use crate::patterns::GlobPattern;
use crate::tasks::{images, names, scripts, sprites};

/// What a binding does when it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchAction {
    /// Run a leaf task; optionally force a full page reload once it has
    /// completed without error.
    RunTask { task: TaskName, then_reload: bool },
    /// Only reload connected browsers.
    Reload,
}

impl fmt::Display for WatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchAction::RunTask { task, then_reload: true } => write!(f, "{task} -> reload"),
            WatchAction::RunTask { task, then_reload: false } => f.write_str(task),
            WatchAction::Reload => f.write_str("reload"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WatchBinding {
    pub name: String,
    pub pattern: GlobPattern,
    pub action: WatchAction,
}

impl WatchBinding {
    pub fn new(name: impl Into<String>, patterns: &[&str], action: WatchAction) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            pattern: GlobPattern::new(patterns)?,
            action,
        })
    }
}

/// A binding that matched one filesystem event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredBinding {
    pub binding: String,
    pub action: WatchAction,
    /// First path of the event that matched.
    pub path: String,
}

/// Ordered binding list.
#[derive(Debug, Clone, Default)]
pub struct WatchTable {
    bindings: Vec<WatchBinding>,
}

fn run_then_reload(task: &str) -> WatchAction {
    WatchAction::RunTask {
        task: task.to_string(),
        then_reload: true,
    }
}

fn run_only(task: &str) -> WatchAction {
    WatchAction::RunTask {
        task: task.to_string(),
        then_reload: false,
    }
}

impl WatchTable {
    pub fn new(bindings: Vec<WatchBinding>) -> Self {
        Self { bindings }
    }

    /// Bindings for `watch` mode. Patterns are relative to the source root.
    ///
    /// Markup, scripts, styles and images announce their own outputs as
    /// they are written. Stylesheets are injected in place; images and
    /// sprites are followed by a full reload.
    pub fn default_bindings() -> Result<Self> {
        Ok(Self::new(vec![
            WatchBinding::new("images", images::SOURCES, run_then_reload(names::RENDER_IMAGES))?,
            WatchBinding::new("styles", &["**/*.scss"], run_only(names::RENDER_STYLES))?,
            WatchBinding::new(
                "sprite-unchanged",
                sprites::UNCHANGED_SOURCES,
                run_then_reload(names::SPRITE_UNCHANGED),
            )?,
            WatchBinding::new(
                "sprite-colorized",
                sprites::COLORIZED_SOURCES,
                run_then_reload(names::SPRITE_COLORIZED),
            )?,
            WatchBinding::new("markup", &["**/*.html"], run_only(names::RENDER_MARKUP))?,
            WatchBinding::new("scripts", scripts::SOURCES, run_only(names::RENDER_SCRIPTS))?,
        ]))
    }

    pub fn bindings(&self) -> &[WatchBinding] {
        &self.bindings
    }

    /// Task names referenced by bindings, for validation.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().filter_map(|b| match &b.action {
            WatchAction::RunTask { task, .. } => Some(task.as_str()),
            WatchAction::Reload => None,
        })
    }

    /// Bindings fired by one event touching `paths` (source-relative).
    ///
    /// Each binding fires at most once per event, however many of the
    /// paths it matches. Bindings are returned in table order.
    pub fn fired<'a, I>(&self, paths: I) -> Vec<FiredBinding>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let paths: Vec<&str> = paths.into_iter().collect();
        self.bindings
            .iter()
            .filter_map(|binding| {
                paths
                    .iter()
                    .find(|p| binding.pattern.matches(p))
                    .map(|p| FiredBinding {
                        binding: binding.name.clone(),
                        action: binding.action.clone(),
                        path: (*p).to_string(),
                    })
            })
            .collect()
    }
}
