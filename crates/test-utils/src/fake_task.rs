use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use sitepipe::errors::{PipelineError, Result};
use sitepipe::tasks::{Task, TaskContext, TaskOutcome};

/// Shared log of task events, in the order they happened.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

#[derive(Debug, Clone)]
enum Behaviour {
    Succeed,
    Fail,
    Degrade,
}

/// A fake task that:
/// - records `start:NAME` and `end:NAME` into a shared log
/// - optionally sleeps in between
/// - then succeeds, fails, or reports itself degraded.
#[derive(Debug, Clone)]
pub struct RecordingTask {
    name: String,
    log: EventLog,
    delay: Duration,
    behaviour: Behaviour,
}

impl RecordingTask {
    pub fn new(name: &str, log: &EventLog) -> Self {
        Self {
            name: name.to_string(),
            log: Arc::clone(log),
            delay: Duration::ZERO,
            behaviour: Behaviour::Succeed,
        }
    }

    pub fn sleeping(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self) -> Self {
        self.behaviour = Behaviour::Fail;
        self
    }

    pub fn degraded(mut self) -> Self {
        self.behaviour = Behaviour::Degrade;
        self
    }

    fn record(&self, event: &str) {
        let mut guard = self.log.lock().unwrap();
        guard.push(format!("{event}:{}", self.name));
    }
}

impl Task for RecordingTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, _ctx: &TaskContext) -> Result<TaskOutcome> {
        self.record("start");
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.record("end");
        match self.behaviour {
            Behaviour::Succeed => Ok(TaskOutcome::written(0)),
            Behaviour::Degrade => Ok(TaskOutcome::Degraded {
                reason: format!("{} degraded on purpose", self.name),
            }),
            Behaviour::Fail => Err(PipelineError::transform(
                "fake",
                self.name.clone(),
                "failed on purpose",
            )),
        }
    }
}
