// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [paths]
/// source = "src"
/// output = "dist"
///
/// [server]
/// port = 3000
///
/// [sprites]
/// padding = 10
/// ```
///
/// All sections are optional; an empty file is the same as the built-in
/// defaults. This is the unvalidated form; see [`PipelineConfig`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPipelineConfig {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub styles: StylesSection,

    #[serde(default)]
    pub scripts: ScriptsSection,

    #[serde(default)]
    pub images: ImagesSection,

    #[serde(default)]
    pub sprites: SpritesSection,
}

/// Validated configuration. Only obtainable through `TryFrom<RawPipelineConfig>`
/// (see `validate.rs`) or [`PipelineConfig::default`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    paths: PathsSection,
    server: ServerSection,
    styles: StylesSection,
    scripts: ScriptsSection,
    images: ImagesSection,
    sprites: SpritesSection,
}

impl PipelineConfig {
    pub(crate) fn new_unchecked(raw: RawPipelineConfig) -> Self {
        Self {
            paths: raw.paths,
            server: raw.server,
            styles: raw.styles,
            scripts: raw.scripts,
            images: raw.images,
            sprites: raw.sprites,
        }
    }

    /// Re-root relative `source`/`output`/`legacy_output` paths onto `base`.
    ///
    /// Used so that paths in a config file are interpreted relative to the
    /// directory containing that file.
    pub fn rooted_at(mut self, base: &Path) -> Self {
        self.paths.source = rebase(base, &self.paths.source);
        self.paths.output = rebase(base, &self.paths.output);
        self.paths.legacy_output = self
            .paths
            .legacy_output
            .as_ref()
            .map(|p| rebase(base, p));
        self
    }

    pub fn paths(&self) -> &PathsSection {
        &self.paths
    }

    pub fn server(&self) -> &ServerSection {
        &self.server
    }

    pub fn styles(&self) -> &StylesSection {
        &self.styles
    }

    pub fn scripts(&self) -> &ScriptsSection {
        &self.scripts
    }

    pub fn images(&self) -> &ImagesSection {
        &self.images
    }

    pub fn sprites(&self) -> &SpritesSection {
        &self.sprites
    }

    pub fn source_root(&self) -> &Path {
        &self.paths.source
    }

    pub fn output_root(&self) -> &Path {
        &self.paths.output
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new_unchecked(RawPipelineConfig::default())
    }
}

fn rebase(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() || base.as_os_str().is_empty() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsSection {
    /// Source root holding `pages/`, `parts/`, `styles/` and `img/`.
    #[serde(default = "default_source")]
    pub source: PathBuf,

    /// Output root; fully cleared on every full build.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Old staging directory removed alongside the output on clean.
    /// Set to an empty string in TOML to disable.
    #[serde(default = "default_legacy_output", deserialize_with = "empty_as_none")]
    pub legacy_output: Option<PathBuf>,
}

fn default_source() -> PathBuf {
    PathBuf::from("src")
}

fn default_output() -> PathBuf {
    PathBuf::from("dist")
}

fn default_legacy_output() -> Option<PathBuf> {
    Some(PathBuf::from("dest"))
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    if s.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(PathBuf::from(s)))
    }
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            source: default_source(),
            output: default_output(),
            legacy_output: default_legacy_output(),
        }
    }
}

/// `[server]` section for `sitepipe watch`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Render an HTML index for directories without an `index.html`.
    #[serde(default = "default_true")]
    pub directory_listing: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_true() -> bool {
    true
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            directory_listing: true,
        }
    }
}

/// `[styles]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StylesSection {
    /// File name of the single emitted stylesheet under `<output>/styles/`.
    #[serde(default = "default_styles_output")]
    pub output_name: String,

    /// Apply vendor prefixing after compilation.
    #[serde(default = "default_true")]
    pub prefix: bool,
}

fn default_styles_output() -> String {
    "styles.css".to_string()
}

impl Default for StylesSection {
    fn default() -> Self {
        Self {
            output_name: default_styles_output(),
            prefix: true,
        }
    }
}

/// `[scripts]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptsSection {
    /// ECMAScript level scripts are lowered to by the built-in transpiler.
    #[serde(default = "default_script_target")]
    pub target: String,

    /// Shell command that reads a script on stdin and writes the transpiled
    /// script to stdout, e.g. `"npx babel --presets @babel/env"`. Replaces
    /// the built-in transpiler when set.
    #[serde(default)]
    pub transpile_cmd: Option<String>,
}

fn default_script_target() -> String {
    "es5".to_string()
}

impl Default for ScriptsSection {
    fn default() -> Self {
        Self {
            target: default_script_target(),
            transpile_cmd: None,
        }
    }
}

/// `[images]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImagesSection {
    #[serde(default = "default_true")]
    pub optimize: bool,
}

impl Default for ImagesSection {
    fn default() -> Self {
        Self { optimize: true }
    }
}

/// `[sprites]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpritesSection {
    /// Padding in pixels around every packed icon.
    #[serde(default = "default_padding")]
    pub padding: u32,

    /// Class prefix for the background-position sprite.
    #[serde(default = "default_unchanged_prefix")]
    pub unchanged_prefix: String,

    /// Class prefix for the symbol sprite.
    #[serde(default = "default_colorized_prefix")]
    pub colorized_prefix: String,
}

fn default_padding() -> u32 {
    10
}

fn default_unchanged_prefix() -> String {
    ".svg-u-".to_string()
}

fn default_colorized_prefix() -> String {
    ".svg-".to_string()
}

impl Default for SpritesSection {
    fn default() -> Self {
        Self {
            padding: default_padding(),
            unchanged_prefix: default_unchanged_prefix(),
            colorized_prefix: default_colorized_prefix(),
        }
    }
}
