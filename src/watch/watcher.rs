// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::patterns::relative_str;
use crate::watch::bindings::WatchTable;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher that observes `root` (the source root)
/// recursively and sends `RuntimeEvent::ActionTriggered` for every binding
/// matched by a notify event.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    table: WatchTable,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    // Canonicalize once so we have a stable base path.
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());
    let table = Arc::new(table);

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("sitepipe: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("sitepipe: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!("file watcher started on {:?}", root);

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "received notify event");

            // Access events (open/close without write) never change content.
            if matches!(event.kind, EventKind::Access(_)) {
                continue;
            }

            let rels: Vec<String> = event
                .paths
                .iter()
                .filter_map(|p| relative_str(&root, p))
                .collect();

            for fired in table.fired(rels.iter().map(String::as_str)) {
                debug!(binding = %fired.binding, path = %fired.path, "watch binding fired");
                let event = RuntimeEvent::ActionTriggered {
                    binding: fired.binding,
                    action: fired.action,
                    path: fired.path,
                };
                if runtime_tx.send(event).await.is_err() {
                    warn!("runtime channel closed; stopping watcher loop");
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}
