// src/transform/styles.rs

//! Stylesheet collaborators: concatenation, SCSS compilation and vendor
//! prefixing.

use std::path::PathBuf;

use lightningcss::rules::CssRuleList;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use tracing::debug;

use crate::errors::{PipelineError, Result};
use crate::transform::{map_each, Asset, Transform};

/// Joins the whole stream into a single asset, in stream order.
#[derive(Debug, Clone)]
pub struct Concat {
    output: PathBuf,
}

impl Concat {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
        }
    }
}

impl Transform for Concat {
    fn name(&self) -> &'static str {
        "concat"
    }

    fn apply(&self, assets: Vec<Asset>) -> Result<Vec<Asset>> {
        if assets.is_empty() {
            return Ok(Vec::new());
        }
        let mut joined: Vec<u8> = Vec::new();
        for asset in &assets {
            if !joined.is_empty() && !joined.ends_with(b"\n") {
                joined.push(b'\n');
            }
            joined.extend_from_slice(&asset.contents);
        }
        debug!(parts = assets.len(), output = ?self.output, "concatenated stream");
        Ok(vec![Asset::new(self.output.clone(), joined)])
    }
}

/// Compiles SCSS to CSS with `grass`. The output asset keeps its path with
/// the extension switched to `.css`.
#[derive(Debug, Clone, Default)]
pub struct ScssCompile {
    load_paths: Vec<PathBuf>,
}

impl ScssCompile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directories searched for `@use` / `@import` targets.
    pub fn with_load_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.load_paths.push(path.into());
        self
    }

    pub fn compile(&self, scss: &str) -> std::result::Result<String, String> {
        let mut options = grass::Options::default();
        for path in &self.load_paths {
            options = options.load_path(path);
        }
        grass::from_string(scss.to_string(), &options).map_err(|e| e.to_string())
    }
}

impl Transform for ScssCompile {
    fn name(&self) -> &'static str {
        "scss"
    }

    fn apply(&self, assets: Vec<Asset>) -> Result<Vec<Asset>> {
        map_each(assets, |asset| {
            let css = self
                .compile(asset.text(self.name())?)
                .map_err(|msg| PipelineError::transform(self.name(), &asset.rel_path, msg))?;
            Ok(Asset::new(asset.rel_path.with_extension("css"), css))
        })
    }
}

/// Adds vendor prefixes for the configured browser targets.
///
/// Rules are printed in source order, duplicates included, so the cascade
/// of the concatenated input is preserved.
#[derive(Debug, Clone, Default)]
pub struct Prefix {
    browsers: Browsers,
}

impl Prefix {
    /// Targets roughly matching a "last 2 versions, > 1%" browserslist
    /// query with IE 11 support.
    pub fn legacy_browsers() -> Self {
        Self {
            browsers: Browsers {
                chrome: Some(version(49)),
                edge: Some(version(16)),
                firefox: Some(version(52)),
                ie: Some(version(11)),
                ios_saf: Some(version(10)),
                opera: Some(version(36)),
                safari: Some(version(10)),
                samsung: Some(version(5)),
                android: Some(version(4) | (4 << 8)),
                ..Browsers::default()
            },
        }
    }

    pub fn with_browsers(browsers: Browsers) -> Self {
        Self { browsers }
    }

    fn targets(&self) -> Targets {
        Targets::from(self.browsers)
    }

    /// Prefix `css` one top-level rule at a time, so rules keep their order
    /// and repeated selectors all survive.
    pub fn prefix(&self, css: &str) -> std::result::Result<String, String> {
        let mut sheet =
            StyleSheet::parse(css, ParserOptions::default()).map_err(|e| e.to_string())?;
        let sources = sheet.sources.clone();
        let rules = std::mem::take(&mut sheet.rules.0);

        let mut out = String::with_capacity(css.len());
        for rule in rules {
            let mut single =
                StyleSheet::new(sources.clone(), CssRuleList(vec![rule]), ParserOptions::default());
            single
                .minify(MinifyOptions {
                    targets: self.targets(),
                    ..MinifyOptions::default()
                })
                .map_err(|e| e.to_string())?;
            let printed = single
                .to_css(PrinterOptions {
                    minify: false,
                    targets: self.targets(),
                    ..PrinterOptions::default()
                })
                .map_err(|e| e.to_string())?;
            if printed.code.trim().is_empty() {
                continue;
            }
            out.push_str(printed.code.trim_end());
            out.push('\n');
        }
        Ok(out)
    }
}

/// lightningcss encodes versions as `major << 16 | minor << 8 | patch`.
fn version(major: u32) -> u32 {
    major << 16
}

impl Transform for Prefix {
    fn name(&self) -> &'static str {
        "prefix"
    }

    fn apply(&self, assets: Vec<Asset>) -> Result<Vec<Asset>> {
        map_each(assets, |asset| {
            let css = self
                .prefix(asset.text(self.name())?)
                .map_err(|msg| PipelineError::transform(self.name(), &asset.rel_path, msg))?;
            Ok(asset.with_contents(css))
        })
    }
}
