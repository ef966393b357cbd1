// src/config/validate.rs

use std::path::{Component, Path, PathBuf};

use crate::config::model::{PathsSection, PipelineConfig, RawPipelineConfig};
use crate::errors::{PipelineError, Result};

impl TryFrom<RawPipelineConfig> for PipelineConfig {
    type Error = crate::errors::PipelineError;

    fn try_from(raw: RawPipelineConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(PipelineConfig::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawPipelineConfig) -> Result<()> {
    validate_paths(cfg)?;
    validate_server(cfg)?;
    validate_styles(cfg)?;
    validate_sprites(cfg)?;
    Ok(())
}

/// Paths are only rooted after conversion, so compare them as written.
fn validate_paths(cfg: &RawPipelineConfig) -> Result<()> {
    check_layout(&cfg.paths, |p| Ok(normalize(p)))
}

impl PipelineConfig {
    /// Check the directory layout once paths are rooted.
    ///
    /// Relative paths resolve against the current directory; `..` and
    /// symlinked ancestors are resolved before comparing.
    pub fn validate_layout(&self) -> Result<()> {
        check_layout(self.paths(), resolve)
    }
}

fn check_layout(paths: &PathsSection, resolve: impl Fn(&Path) -> Result<PathBuf>) -> Result<()> {
    if paths.output.as_os_str().is_empty() || normalize(&paths.output).as_os_str().is_empty() {
        return Err(PipelineError::ConfigError(
            "[paths].output must not be empty (it is cleared on every build)".to_string(),
        ));
    }

    let source = resolve(&paths.source)?;
    let output = resolve(&paths.output)?;

    if source == output {
        return Err(PipelineError::ConfigError(format!(
            "[paths].source and [paths].output must differ (both are {:?})",
            paths.source
        )));
    }

    // The clean step deletes the output tree, so it must never contain the
    // sources, and sources must not contain the output (the watcher would
    // see its own writes).
    if source.starts_with(&output) || output.starts_with(&source) {
        return Err(PipelineError::ConfigError(format!(
            "[paths].source ({:?}) and [paths].output ({:?}) must not be nested",
            paths.source, paths.output
        )));
    }

    if let Some(legacy) = &paths.legacy_output {
        let resolved = resolve(legacy)?;
        let overlaps = |root: &Path| root.starts_with(&resolved) || resolved.starts_with(root);
        if overlaps(&source) || output.starts_with(&resolved) {
            return Err(PipelineError::ConfigError(format!(
                "[paths].legacy_output ({:?}) must not contain or sit inside the source, \
                 nor contain the output",
                legacy
            )));
        }
    }

    Ok(())
}

fn validate_server(cfg: &RawPipelineConfig) -> Result<()> {
    if cfg.server.port == 0 {
        return Err(PipelineError::ConfigError(
            "[server].port must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.server.host.trim().is_empty() {
        return Err(PipelineError::ConfigError(
            "[server].host must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_styles(cfg: &RawPipelineConfig) -> Result<()> {
    let name = cfg.styles.output_name.trim();
    if name.is_empty() || name.contains('/') || name.contains('\\') {
        return Err(PipelineError::ConfigError(format!(
            "[styles].output_name must be a plain file name (got {:?})",
            cfg.styles.output_name
        )));
    }
    Ok(())
}

fn validate_sprites(cfg: &RawPipelineConfig) -> Result<()> {
    for (key, prefix) in [
        ("unchanged_prefix", &cfg.sprites.unchanged_prefix),
        ("colorized_prefix", &cfg.sprites.colorized_prefix),
    ] {
        if !prefix.starts_with('.') || prefix.len() < 2 {
            return Err(PipelineError::ConfigError(format!(
                "[sprites].{key} must be a class selector prefix like \".svg-\" (got {prefix:?})"
            )));
        }
    }
    Ok(())
}

/// Lexically normalise a path: drop `.` segments and fold `..` into the
/// preceding segment.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Absolute, normalised form of `path`. The deepest existing ancestor is
/// canonicalised so symlinks compare equal to their targets.
fn resolve(path: &Path) -> Result<PathBuf> {
    let absolute = normalize(&std::path::absolute(path)?);

    let mut existing = absolute.as_path();
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return Ok(rest.iter().rev().fold(canonical, |acc, part| acc.join(part)));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(absolute),
        }
    }
}
