// src/patterns.rs

//! Ordered include/exclude glob patterns and source selection.
//!
//! A [`GlobPattern`] is written the way build scripts usually write them:
//!
//! ```text
//! ["img/**/*", "!img/svg-sprites", "!img/svg-sprites/**"]
//! ```
//!
//! Patterns starting with `!` are excludes. An exclude only overrides the
//! includes that come *before* it, so order matters. All patterns are
//! evaluated against forward-slash paths relative to the source root.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;

/// Compiled, ordered include/exclude glob list.
#[derive(Clone)]
pub struct GlobPattern {
    raw: Vec<String>,
    includes: GlobSet,
    /// Position in `raw` of each include glob, indexed like `includes`.
    include_pos: Vec<usize>,
    excludes: GlobSet,
    /// Position in `raw` of each exclude glob, indexed like `excludes`.
    exclude_pos: Vec<usize>,
}

impl fmt::Debug for GlobPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GlobPattern").field(&self.raw).finish()
    }
}

impl fmt::Display for GlobPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.raw.join(", "))
    }
}

impl GlobPattern {
    /// Compile an ordered pattern list.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let raw: Vec<String> = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        let mut includes = GlobSetBuilder::new();
        let mut include_pos = Vec::new();
        let mut excludes = GlobSetBuilder::new();
        let mut exclude_pos = Vec::new();

        for (pos, pat) in raw.iter().enumerate() {
            let (negated, body) = match pat.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, pat.as_str()),
            };
            let body = body.trim_start_matches("./").trim_end_matches('/');
            let glob = GlobBuilder::new(body)
                .literal_separator(true)
                .build()
                .with_context(|| format!("invalid glob pattern: {pat}"))?;
            if negated {
                excludes.add(glob);
                exclude_pos.push(pos);
            } else {
                includes.add(glob);
                include_pos.push(pos);
            }
        }

        if include_pos.is_empty() {
            return Err(PipelineError::ConfigError(format!(
                "glob pattern list {raw:?} has no include pattern"
            )));
        }

        Ok(Self {
            raw,
            includes: includes.build().context("building include globset")?,
            include_pos,
            excludes: excludes.build().context("building exclude globset")?,
            exclude_pos,
        })
    }

    /// The patterns as written.
    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    /// Returns true if `rel_path` (relative, forward slashes) is selected.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.rank(rel_path).is_some()
    }

    /// Ordinal of the first include pattern that selects `rel_path`, or
    /// `None` if the path is not selected.
    ///
    /// An include at position `i` selects the path unless an exclude at a
    /// position greater than `i` also matches it.
    pub fn rank(&self, rel_path: &str) -> Option<usize> {
        let last_exclude = self
            .excludes
            .matches(rel_path)
            .into_iter()
            .map(|idx| self.exclude_pos[idx])
            .max();

        self.includes
            .matches(rel_path)
            .into_iter()
            .filter(|&idx| last_exclude.is_none_or(|ex| ex < self.include_pos[idx]))
            .min()
    }
}

/// A selected source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Full path on the filesystem.
    pub path: PathBuf,
    /// Path relative to the selection root, forward slashes.
    pub rel: String,
}

/// Collect all files under `root` selected by `pattern`.
///
/// Ordering follows the pattern list: files selected by the first include
/// come first, then files first selected by the second include, and so on.
/// Within one include, files are sorted by relative path. Each file appears
/// once.
///
/// A missing `root` is a [`PipelineError::MissingSource`].
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    pattern: &GlobPattern,
) -> Result<Vec<SourceFile>> {
    if !fs.is_dir(root) {
        return Err(PipelineError::MissingSource(root.to_path_buf()));
    }

    let mut ranked: Vec<(usize, SourceFile)> = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                let Some(rel) = relative_str(root, &path) else {
                    continue;
                };
                if let Some(rank) = pattern.rank(&rel) {
                    ranked.push((rank, SourceFile { path, rel }));
                }
            }
        }
    }

    ranked.sort_by(|(ra, a), (rb, b)| ra.cmp(rb).then_with(|| a.rel.cmp(&b.rel)));
    Ok(ranked.into_iter().map(|(_, file)| file).collect())
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Returns `None` if the path is not under `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}
