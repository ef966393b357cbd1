// tests/composer.rs

mod common;
use crate::common::fake_task::{event_log, EventLog, RecordingTask};
use crate::common::{init_tracing, mock_context, with_timeout};

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use sitepipe::engine::{Composer, RunSequence, Step};
use sitepipe::errors::PipelineError;
use sitepipe::fs::mock::MockFileSystem;
use sitepipe::tasks::{names, TaskOutcome, TaskRegistry};

type TestResult = Result<(), Box<dyn Error>>;

fn composer(tasks: Vec<RecordingTask>) -> Composer {
    let mut registry = TaskRegistry::new();
    for task in tasks {
        registry.register(task);
    }
    Composer::new(Arc::new(registry), mock_context(&MockFileSystem::new()))
}

fn entries(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn series(names: &[&str]) -> RunSequence {
    RunSequence::new(Step::series(names.iter().map(|n| Step::task(*n))))
}

#[tokio::test]
async fn series_runs_each_task_to_completion_in_order() -> TestResult {
    with_timeout(async {
        init_tracing();
        let log = event_log();
        let composer = composer(vec![
            RecordingTask::new("a", &log).sleeping(Duration::from_millis(20)),
            RecordingTask::new("b", &log),
            RecordingTask::new("c", &log),
        ]);

        let report = composer.run(&series(&["a", "b", "c"])).await?;

        assert_eq!(
            entries(&log),
            vec!["start:a", "end:a", "start:b", "end:b", "start:c", "end:c"]
        );
        let ran: Vec<_> = report.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(ran, vec!["a", "b", "c"]);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn failure_stops_the_sequence() -> TestResult {
    with_timeout(async {
        let log = event_log();
        let composer = composer(vec![
            RecordingTask::new("a", &log),
            RecordingTask::new("b", &log).failing(),
            RecordingTask::new("c", &log),
        ]);

        let err = composer.run(&series(&["a", "b", "c"])).await.unwrap_err();
        assert!(matches!(err, PipelineError::Transform { .. }), "{err:?}");
        assert_eq!(entries(&log), vec!["start:a", "end:a", "start:b", "end:b"]);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn degraded_task_does_not_stop_the_sequence() -> TestResult {
    with_timeout(async {
        let log = event_log();
        let composer = composer(vec![
            RecordingTask::new("a", &log).degraded(),
            RecordingTask::new("b", &log),
        ]);

        let report = composer.run(&series(&["a", "b"])).await?;
        assert!(matches!(report[0].1, TaskOutcome::Degraded { .. }));
        assert_eq!(report[1].1, TaskOutcome::Success { written: 0 });
        Ok(())
    })
    .await
}

#[tokio::test]
async fn unknown_task_is_rejected_before_anything_runs() -> TestResult {
    with_timeout(async {
        let log = event_log();
        let composer = composer(vec![RecordingTask::new("a", &log)]);

        let err = composer.run(&series(&["a", "ghost"])).await.unwrap_err();
        assert!(matches!(err, PipelineError::TaskNotFound(ref n) if n == "ghost"), "{err:?}");
        assert!(entries(&log).is_empty());

        let err = composer.run_task("ghost").await.unwrap_err();
        assert!(matches!(err, PipelineError::TaskNotFound(_)));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn parallel_children_overlap() -> TestResult {
    with_timeout(async {
        let log = event_log();
        let composer = composer(vec![
            RecordingTask::new("slow", &log).sleeping(Duration::from_millis(200)),
            RecordingTask::new("fast", &log).sleeping(Duration::from_millis(50)),
            RecordingTask::new("after", &log),
        ]);
        let sequence = RunSequence::new(Step::series([
            Step::parallel([Step::task("slow"), Step::task("fast")]),
            Step::task("after"),
        ]));

        let report = composer.run(&sequence).await?;

        let log = entries(&log);
        let pos = |e: &str| log.iter().position(|x| x == e).unwrap();
        assert!(pos("start:fast") < pos("end:slow"));
        assert!(pos("start:slow") < pos("end:fast"));
        assert_eq!(log.last().map(String::as_str), Some("end:after"));
        // Reports come back in declaration order.
        let ran: Vec<_> = report.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(ran, vec!["slow", "fast", "after"]);
        Ok(())
    })
    .await
}

#[test]
fn default_build_cleans_first_and_covers_every_task() {
    let build = RunSequence::default_build();
    let order = build.task_names();
    assert_eq!(
        order,
        vec![
            names::CLEAN_OUTPUT,
            names::RENDER_MARKUP,
            names::RENDER_SCRIPTS,
            names::RENDER_IMAGES,
            names::SPRITE_UNCHANGED,
            names::SPRITE_COLORIZED,
            names::RENDER_STYLES,
        ]
    );

    let registry = TaskRegistry::with_defaults();
    assert!(build.validate(&registry).is_ok());
    assert_eq!(registry.len(), order.len());
}

#[test]
fn sequences_render_readably() {
    let sequence = RunSequence::new(Step::series([
        Step::task("a"),
        Step::parallel([Step::task("b"), Step::task("c")]),
    ]));
    assert_eq!(sequence.to_string(), "a -> (b | c)");
}
