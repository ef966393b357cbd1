#![allow(dead_code)]

pub use sitepipe_test_utils::builders;
pub use sitepipe_test_utils::fake_task;
pub use sitepipe_test_utils::{init_tracing, with_timeout};

use std::sync::Arc;

use sitepipe::config::PipelineConfig;
use sitepipe::fs::FileSystem;
use sitepipe::fs::mock::MockFileSystem;
use sitepipe::server::ReloadHandle;
use sitepipe::tasks::TaskContext;

/// Context over an in-memory filesystem with the default layout
/// (`src/` sources, `dist/` output).
pub fn mock_context(fs: &MockFileSystem) -> TaskContext {
    let fs: Arc<dyn FileSystem> = Arc::new(fs.clone());
    TaskContext::new(PipelineConfig::default(), fs, ReloadHandle::new())
}
