// tests/watch_dispatch.rs

mod common;
use crate::common::fake_task::{event_log, RecordingTask};
use crate::common::{init_tracing, mock_context, with_timeout};

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use sitepipe::engine::{Composer, Runtime, RuntimeEvent};
use sitepipe::fs::mock::MockFileSystem;
use sitepipe::tasks::{names, TaskRegistry};
use sitepipe::watch::{WatchAction, WatchTable};

type TestResult = Result<(), Box<dyn Error>>;

fn fired_names(table: &WatchTable, paths: &[&str]) -> Vec<String> {
    table
        .fired(paths.iter().copied())
        .into_iter()
        .map(|f| f.binding)
        .collect()
}

#[test]
fn each_source_kind_routes_to_its_task() -> TestResult {
    let table = WatchTable::default_bindings()?;

    assert_eq!(fired_names(&table, &["styles/base.scss"]), vec!["styles"]);
    assert_eq!(fired_names(&table, &["parts/header/header.scss"]), vec!["styles"]);
    assert_eq!(fired_names(&table, &["pages/home/index.html"]), vec!["markup"]);
    assert_eq!(fired_names(&table, &["parts/footer/footer.html"]), vec!["markup"]);
    assert_eq!(fired_names(&table, &["pages/home/app.js"]), vec!["scripts"]);
    // Only page scripts are rendered, so other scripts do not trigger a run.
    assert!(fired_names(&table, &["parts/widget/widget.js"]).is_empty());
    assert_eq!(fired_names(&table, &["img/photos/cat.png"]), vec!["images"]);
    assert_eq!(
        fired_names(&table, &["img/svg-sprites/colorized/bell.svg"]),
        vec!["sprite-colorized"]
    );
    assert_eq!(
        fired_names(&table, &["img/svg-sprites/unchanged/logo.svg"]),
        vec!["sprite-unchanged"]
    );
    assert!(fired_names(&table, &["README.md"]).is_empty());
    Ok(())
}

#[test]
fn a_binding_fires_once_per_event() -> TestResult {
    let table = WatchTable::default_bindings()?;
    let fired = table.fired(["styles/a.scss", "styles/b.scss", "img/x.png"]);

    assert_eq!(fired.len(), 2);
    // Table order, first matching path reported.
    assert_eq!(fired[0].binding, "images");
    assert_eq!(fired[0].path, "img/x.png");
    assert_eq!(fired[1].binding, "styles");
    assert_eq!(fired[1].path, "styles/a.scss");
    assert_eq!(
        fired[1].action,
        WatchAction::RunTask {
            task: names::RENDER_STYLES.to_string(),
            then_reload: false
        }
    );
    Ok(())
}

#[test]
fn streaming_tasks_do_not_force_a_reload() -> TestResult {
    let table = WatchTable::default_bindings()?;
    for binding in table.bindings() {
        let streams = matches!(binding.name.as_str(), "markup" | "scripts" | "styles");
        match &binding.action {
            WatchAction::RunTask { then_reload, .. } => {
                assert_eq!(*then_reload, !streams, "binding {}", binding.name)
            }
            WatchAction::Reload => panic!("unexpected reload-only binding {}", binding.name),
        }
    }

    let registry = TaskRegistry::with_defaults();
    assert!(table.task_names().all(|t| registry.contains(t)));
    Ok(())
}

fn runtime_with(tasks: Vec<RecordingTask>) -> (Composer, mpsc::Sender<RuntimeEvent>, Runtime) {
    let mut registry = TaskRegistry::new();
    for task in tasks {
        registry.register(task);
    }
    let composer = Composer::new(Arc::new(registry), mock_context(&MockFileSystem::new()));
    let (tx, rx) = mpsc::channel(16);
    let runtime = Runtime::new(composer.clone(), rx);
    (composer, tx, runtime)
}

fn trigger(task: &str, then_reload: bool) -> RuntimeEvent {
    RuntimeEvent::ActionTriggered {
        binding: task.to_string(),
        action: WatchAction::RunTask {
            task: task.to_string(),
            then_reload,
        },
        path: "whatever".to_string(),
    }
}

#[tokio::test]
async fn runtime_runs_triggered_task_then_reloads() -> TestResult {
    with_timeout(async {
        init_tracing();
        let log = event_log();
        let (composer, tx, runtime) = runtime_with(vec![RecordingTask::new("styles", &log)]);

        tx.send(trigger("styles", true)).await?;
        tx.send(RuntimeEvent::ShutdownRequested).await?;
        runtime.run().await?;

        assert_eq!(*log.lock().unwrap(), vec!["start:styles", "end:styles"]);
        assert_eq!(composer.context().reload.seq(), 1);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn failed_task_is_logged_and_does_not_reload() -> TestResult {
    with_timeout(async {
        let log = event_log();
        let (composer, tx, runtime) = runtime_with(
            vec![
                RecordingTask::new("broken", &log).failing(),
                RecordingTask::new("fine", &log),
            ],
        );

        tx.send(trigger("broken", true)).await?;
        tx.send(trigger("ghost", true)).await?;
        tx.send(trigger("fine", false)).await?;
        tx.send(RuntimeEvent::ShutdownRequested).await?;
        runtime.run().await?;

        let log = log.lock().unwrap().clone();
        assert!(log.contains(&"end:broken".to_string()));
        assert!(log.contains(&"end:fine".to_string()));
        assert_eq!(composer.context().reload.seq(), 0);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn dispatches_overlap_and_shutdown_waits_for_them() -> TestResult {
    with_timeout(async {
        let log = event_log();
        let (_composer, tx, runtime) = runtime_with(
            vec![
                RecordingTask::new("slow", &log).sleeping(Duration::from_millis(200)),
                RecordingTask::new("quick", &log),
            ],
        );

        tx.send(trigger("slow", false)).await?;
        tx.send(trigger("quick", false)).await?;
        tx.send(RuntimeEvent::ShutdownRequested).await?;
        runtime.run().await?;

        let log = log.lock().unwrap().clone();
        let pos = |e: &str| log.iter().position(|x| x == e).unwrap();
        assert!(pos("end:quick") < pos("end:slow"), "{log:?}");
        Ok(())
    })
    .await
}

#[tokio::test]
async fn reload_action_only_reloads() -> TestResult {
    with_timeout(async {
        let log = event_log();
        let (composer, tx, runtime) = runtime_with(Vec::new());

        tx.send(RuntimeEvent::ActionTriggered {
            binding: "any".to_string(),
            action: WatchAction::Reload,
            path: "x".to_string(),
        })
        .await?;
        drop(tx);
        runtime.run().await?;

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(composer.context().reload.seq(), 1);
        Ok(())
    })
    .await
}
