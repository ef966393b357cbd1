#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sitepipe::config::PipelineConfig;
use sitepipe::fs::{FileSystem, RealFileSystem};
use sitepipe::server::ReloadHandle;
use sitepipe::tasks::TaskContext;
use tempfile::TempDir;

/// A throwaway project on disk: `<tmp>/src` for sources, `<tmp>/dist` for
/// output, `<tmp>/dest` as the legacy staging directory.
pub struct ProjectBuilder {
    dir: TempDir,
}

impl ProjectBuilder {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    /// Add a source file at `rel` (relative to `src/`).
    pub fn source(self, rel: &str, contents: impl AsRef<[u8]>) -> Self {
        self.write(&Path::new("src").join(rel), contents.as_ref());
        self
    }

    /// Add a file at `rel` (relative to the output directory), e.g. a
    /// leftover from a previous build.
    pub fn output(self, rel: &str, contents: impl AsRef<[u8]>) -> Self {
        self.write(&Path::new("dist").join(rel), contents.as_ref());
        self
    }

    /// Add a file under the project root itself.
    pub fn file(self, rel: &str, contents: impl AsRef<[u8]>) -> Self {
        self.write(Path::new(rel), contents.as_ref());
        self
    }

    pub fn dir(self, rel: &str) -> Self {
        fs::create_dir_all(self.dir.path().join(rel)).expect("create dir");
        self
    }

    fn write(&self, rel: &Path, contents: &[u8]) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, contents).expect("write file");
    }

    pub fn build(self) -> Project {
        let config = PipelineConfig::default().rooted_at(self.dir.path());
        Project {
            dir: self.dir,
            config,
        }
    }
}

impl Default for ProjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Project {
    dir: TempDir,
    pub config: PipelineConfig,
}

impl Project {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn source_path(&self, rel: &str) -> PathBuf {
        self.config.source_root().join(rel)
    }

    pub fn output_path(&self, rel: &str) -> PathBuf {
        self.config.output_root().join(rel)
    }

    /// Output file as text, `None` if missing.
    pub fn read_output(&self, rel: &str) -> Option<String> {
        fs::read_to_string(self.output_path(rel)).ok()
    }

    pub fn output_exists(&self, rel: &str) -> bool {
        self.output_path(rel).exists()
    }

    /// Every file under the output directory, relative, sorted.
    pub fn output_files(&self) -> Vec<String> {
        let mut out = Vec::new();
        let root = self.config.output_root();
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if let Ok(rel) = path.strip_prefix(root) {
                    out.push(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        out.sort();
        out
    }

    /// Task context over the real filesystem with a fresh reload handle.
    pub fn context(&self) -> TaskContext {
        self.context_with(ReloadHandle::new())
    }

    pub fn context_with(&self, reload: ReloadHandle) -> TaskContext {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        TaskContext::new(self.config.clone(), fs, reload)
    }
}
