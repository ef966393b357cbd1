// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::{PipelineConfig, RawPipelineConfig};
use crate::errors::Result;

/// File name looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "Sitepipe.toml";

/// Load a configuration file from a given path and return the raw
/// `RawPipelineConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPipelineConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawPipelineConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// Relative paths inside the file are resolved against the directory that
/// contains the file.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let path = path.as_ref();
    let raw_config = load_from_path(path)?;
    let config = PipelineConfig::try_from(raw_config)?.rooted_at(&config_root_dir(path));
    // Absolute paths and `..` only show their real layout once rooted.
    config.validate_layout()?;
    Ok(config)
}

/// Resolve the configuration for a CLI invocation.
///
/// A missing file at the *default* location means "use built-in defaults
/// relative to the current directory"; a missing file that was asked for
/// explicitly is an error.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let path = path.as_ref();
    if !path.exists() && path == Path::new(DEFAULT_CONFIG_FILE) {
        info!("no {DEFAULT_CONFIG_FILE} found; using built-in defaults");
        return Ok(PipelineConfig::default());
    }
    load_and_validate(path)
}

/// Directory that relative config paths are resolved against.
///
/// - If the config path has a non-empty parent (e.g. "site/Sitepipe.toml"),
///   we use that directory.
/// - If it's a bare filename (parent = ""), paths stay relative to the
///   current working directory.
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::new(),
    }
}
