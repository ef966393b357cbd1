// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod patterns;
pub mod server;
pub mod tasks;
pub mod transform;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::{load_or_default, PipelineConfig};
use crate::engine::{Composer, RunSequence, Runtime, RuntimeEvent, TaskName};
use crate::errors::PipelineError;
use crate::fs::{FileSystem, RealFileSystem};
use crate::server::ReloadHandle;
use crate::tasks::{TaskContext, TaskOutcome, TaskRegistry};
use crate::watch::WatchTable;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - task registry and the build sequence
/// - the composer
/// - (watch mode) dev server, file watcher, runtime loop
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_or_default(&config_path)?;

    let registry = Arc::new(TaskRegistry::with_defaults());
    let build = RunSequence::default_build();
    build.validate(&registry)?;
    let table = WatchTable::default_bindings()?;
    if let Some(missing) = table.task_names().find(|n| !registry.contains(n)) {
        return Err(PipelineError::TaskNotFound(missing.to_string()).into());
    }

    let command = args.command();
    if let Command::Run { task } = &command {
        // Unknown names fail before anything touches the filesystem.
        registry.get(task)?;
    }

    if command == Command::List || args.dry_run {
        print_plan(&cfg, &registry, &build, &table, &command);
        return Ok(());
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let reload = ReloadHandle::new();
    let ctx = TaskContext::new(cfg, Arc::clone(&fs), reload.clone());
    let composer = Composer::new(Arc::clone(&registry), ctx);

    match command {
        Command::Build => {
            let report = composer.run(&build).await?;
            summarize(&report);
        }
        Command::Run { task } => {
            let outcome = composer.run_task(&task).await?;
            summarize(&[(task, outcome)]);
        }
        Command::Watch => {
            let report = composer.run(&build).await?;
            summarize(&report);
            serve_and_watch(composer, table, fs, reload).await?;
        }
        Command::List => {}
    }

    Ok(())
}

async fn serve_and_watch(
    composer: Composer,
    table: WatchTable,
    fs: Arc<dyn FileSystem>,
    reload: ReloadHandle,
) -> Result<()> {
    let cfg = Arc::clone(&composer.context().config);

    let server = server::spawn_server(&cfg, fs, reload)?;

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let _watcher_handle = watch::spawn_watcher(cfg.source_root(), table, rt_tx.clone())?;

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    info!(addr = %server.addr(), "watching for changes (Ctrl+C to stop)");
    let runtime = Runtime::new(composer, rt_rx);
    let result = runtime.run().await;
    server.shutdown();
    result?;
    Ok(())
}

fn summarize(report: &[(TaskName, TaskOutcome)]) {
    for (task, outcome) in report {
        if let TaskOutcome::Degraded { reason } = outcome {
            warn!(task = %task, reason = %reason, "task degraded; outputs not updated");
        }
    }
    let degraded = report
        .iter()
        .filter(|(_, o)| matches!(o, TaskOutcome::Degraded { .. }))
        .count();
    info!(tasks = report.len(), degraded, "done");
}

/// Print the resolved configuration, tasks, build order and watch
/// bindings without running anything.
fn print_plan(
    cfg: &PipelineConfig,
    registry: &TaskRegistry,
    build: &RunSequence,
    table: &WatchTable,
    command: &Command,
) {
    println!("sitepipe plan");
    println!("  source = {:?}", cfg.source_root());
    println!("  output = {:?}", cfg.output_root());
    if let Some(legacy) = &cfg.paths().legacy_output {
        println!("  legacy_output = {:?}", legacy);
    }
    println!(
        "  server = {}:{} (directory listing: {})",
        cfg.server().host,
        cfg.server().port,
        cfg.server().directory_listing
    );
    if let Some(cmd) = &cfg.scripts().transpile_cmd {
        println!("  scripts.transpile_cmd = {cmd}");
    }
    println!();

    println!("tasks ({}):", registry.len());
    for (name, task) in registry.iter() {
        println!("  - {name}: {}", task.description());
    }
    println!();

    match command {
        Command::Run { task } => println!("run: {task}"),
        _ => println!("build: {build}"),
    }

    if matches!(command, Command::Watch | Command::List) {
        println!();
        println!("watch ({}):", table.bindings().len());
        for binding in table.bindings() {
            println!("  - {}: {} => {}", binding.name, binding.pattern, binding.action);
        }
    }

    debug!("plan printed (no execution)");
}
