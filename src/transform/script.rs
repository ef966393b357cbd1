// src/transform/script.rs

//! In-process script transpilation with `oxc`.
//!
//! Each script is parsed, lowered to the configured ECMAScript target and
//! printed back. Syntax newer than the target (arrow functions, `**`,
//! `??`, optional chaining, object spread, async functions, class fields)
//! is rewritten; block scoping (`let`/`const`) is left as is.

use std::path::Path;

use oxc::allocator::Allocator;
use oxc::codegen::Codegen;
use oxc::parser::Parser;
use oxc::semantic::SemanticBuilder;
use oxc::span::SourceType;
use oxc::transformer::{TransformOptions, Transformer};
use tracing::debug;

use crate::errors::{PipelineError, Result};
use crate::transform::{map_each, Asset, Transform};

#[derive(Debug, Clone)]
pub struct Transpile {
    target: String,
}

impl Transpile {
    /// `target` is an ECMAScript level such as `"es5"` or `"es2017"`.
    pub fn new(target: &str) -> Result<Self> {
        options_for(target)?;
        Ok(Self {
            target: target.to_string(),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Transpile one script. `path` only names the file in diagnostics and
    /// picks the dialect from its extension.
    pub fn transpile(&self, path: &Path, source: &str) -> std::result::Result<String, String> {
        let allocator = Allocator::default();
        let source_type = SourceType::from_path(path).unwrap_or_default();

        let parsed = Parser::new(&allocator, source, source_type).parse();
        if parsed.panicked || !parsed.errors.is_empty() {
            return Err(join_errors(&parsed.errors));
        }
        let mut program = parsed.program;

        let scoping = SemanticBuilder::new().build(&program).semantic.into_scoping();
        let options = options_for(&self.target).map_err(|e| e.to_string())?;
        let transformed = Transformer::new(&allocator, path, &options)
            .build_with_scoping(scoping, &mut program);
        if !transformed.errors.is_empty() {
            return Err(join_errors(&transformed.errors));
        }

        Ok(Codegen::new().build(&program).code)
    }
}

fn options_for(target: &str) -> Result<TransformOptions> {
    TransformOptions::from_target(target).map_err(|e| {
        PipelineError::ConfigError(format!("[scripts].target {target:?} is not supported: {e}"))
    })
}

fn join_errors<E: std::fmt::Display>(errors: &[E]) -> String {
    if errors.is_empty() {
        return "parser gave up".to_string();
    }
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Transform for Transpile {
    fn name(&self) -> &'static str {
        "transpile"
    }

    fn apply(&self, assets: Vec<Asset>) -> Result<Vec<Asset>> {
        debug!(target = %self.target, files = assets.len(), "transpiling scripts");
        map_each(assets, |asset| {
            let code = self
                .transpile(&asset.rel_path, asset.text(self.name())?)
                .map_err(|msg| PipelineError::transform(self.name(), &asset.rel_path, msg))?;
            Ok(asset.with_contents(code))
        })
    }
}
