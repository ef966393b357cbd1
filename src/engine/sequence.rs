// src/engine/sequence.rs

//! Declarative run sequences.

use std::fmt;

use crate::engine::TaskName;
use crate::errors::{PipelineError, Result};
use crate::tasks::{names, TaskRegistry};

/// One node of a run sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Task(TaskName),
    /// Children run one after another, each to completion.
    Series(Vec<Step>),
    /// Children start together; the step ends when all have ended.
    Parallel(Vec<Step>),
}

impl Step {
    pub fn task(name: impl Into<TaskName>) -> Self {
        Step::Task(name.into())
    }

    pub fn series(steps: impl IntoIterator<Item = Step>) -> Self {
        Step::Series(steps.into_iter().collect())
    }

    pub fn parallel(steps: impl IntoIterator<Item = Step>) -> Self {
        Step::Parallel(steps.into_iter().collect())
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Step::Task(name) => out.push(name),
            Step::Series(steps) | Step::Parallel(steps) => {
                for step in steps {
                    step.collect_names(out);
                }
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, steps: &[Step], sep: &str) -> fmt::Result {
    for (i, step) in steps.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        match step {
            // Nested series flatten visually; only parallel groups need brackets.
            Step::Task(_) | Step::Series(_) => write!(f, "{step}")?,
            Step::Parallel(_) => write!(f, "({step})")?,
        }
    }
    Ok(())
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Task(name) => f.write_str(name),
            Step::Series(steps) => write_joined(f, steps, " -> "),
            Step::Parallel(steps) => write_joined(f, steps, " | "),
        }
    }
}

/// A validated-on-demand tree of steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSequence {
    root: Step,
}

impl RunSequence {
    pub fn new(root: Step) -> Self {
        Self { root }
    }

    pub fn single(task: impl Into<TaskName>) -> Self {
        Self::new(Step::task(task))
    }

    /// The full build: one flat series, cleaning first.
    pub fn default_build() -> Self {
        Self::new(Step::series(
            [
                names::CLEAN_OUTPUT,
                names::RENDER_MARKUP,
                names::RENDER_SCRIPTS,
                names::RENDER_IMAGES,
                names::SPRITE_UNCHANGED,
                names::SPRITE_COLORIZED,
                names::RENDER_STYLES,
            ]
            .map(Step::task),
        ))
    }

    pub fn root(&self) -> &Step {
        &self.root
    }

    /// Task names in execution order (parallel children in declaration
    /// order).
    pub fn task_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.root.collect_names(&mut out);
        out
    }

    /// Every referenced task must be registered.
    pub fn validate(&self, registry: &TaskRegistry) -> Result<()> {
        match self.task_names().into_iter().find(|n| !registry.contains(n)) {
            Some(missing) => Err(PipelineError::TaskNotFound(missing.to_string())),
            None => Ok(()),
        }
    }
}

impl fmt::Display for RunSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}
