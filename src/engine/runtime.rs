// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::errors::Result;
use crate::watch::WatchAction;

use super::RuntimeEvent;
use super::composer::Composer;

/// Watch-mode event loop.
///
/// Every triggered action is dispatched on its own Tokio task straight
/// away: dispatches never wait for one another, and there is no debounce.
/// Two dispatches writing the same output race; the last writer wins.
/// A failing dispatch is logged and the loop carries on.
pub struct Runtime {
    composer: Composer,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    in_flight: JoinSet<()>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(composer: Composer, event_rx: mpsc::Receiver<RuntimeEvent>) -> Self {
        Self {
            composer,
            event_rx,
            in_flight: JoinSet::new(),
        }
    }

    /// Main event loop.
    ///
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Spawns one dispatch per triggered action.
    /// - Reaps finished dispatches as they complete.
    ///
    /// Returns once shutdown is requested or the channel closes, after the
    /// dispatches still running have finished.
    pub async fn run(mut self) -> Result<()> {
        info!("sitepipe watch runtime started");

        loop {
            tokio::select! {
                maybe_event = self.event_rx.recv() => {
                    let event = match maybe_event {
                        Some(e) => e,
                        None => {
                            info!("runtime event channel closed; exiting");
                            break;
                        }
                    };
                    debug!(?event, "runtime received event");
                    match event {
                        RuntimeEvent::ActionTriggered { binding, action, path } => {
                            self.dispatch(binding, action, path);
                        }
                        RuntimeEvent::ShutdownRequested => {
                            info!("shutdown requested; stopping runtime");
                            break;
                        }
                    }
                }
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "watch dispatch panicked");
                    }
                }
            }
        }

        if !self.in_flight.is_empty() {
            info!(in_flight = self.in_flight.len(), "waiting for running dispatches");
        }
        while let Some(joined) = self.in_flight.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "watch dispatch panicked");
            }
        }

        info!("runtime exiting");
        Ok(())
    }

    fn dispatch(&mut self, binding: String, action: WatchAction, path: String) {
        info!(binding = %binding, path = %path, action = %action, "dispatching");
        let composer = self.composer.clone();
        self.in_flight.spawn(async move {
            match action {
                WatchAction::RunTask { task, then_reload } => match composer.run_task(&task).await {
                    Ok(_) => {
                        if then_reload {
                            composer.context().reload.reload();
                        }
                    }
                    Err(e) => {
                        error!(binding = %binding, task = %task, error = %e, "watch-triggered task failed");
                    }
                },
                WatchAction::Reload => {
                    composer.context().reload.reload();
                }
            }
        });
    }
}
