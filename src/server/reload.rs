// src/server/reload.rs

//! Live-reload notifications.
//!
//! Tasks publish [`ReloadSignal`]s through a [`ReloadHandle`]; the dev
//! server's long-poll endpoint waits on the same handle. Every signal gets a
//! sequence number, and a client asks for "everything after N". Publishing
//! with nobody waiting is a no-op apart from bumping the sequence.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

/// Signals kept for clients that poll late.
const HISTORY_LEN: usize = 32;

/// What connected browsers should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadSignal {
    /// Reload the whole page.
    Reload,
    /// Swap the listed stylesheets in place (paths relative to the served
    /// root, forward slashes).
    Inject { paths: Vec<String> },
}

impl ReloadSignal {
    pub fn kind(&self) -> &'static str {
        match self {
            ReloadSignal::Reload => "reload",
            ReloadSignal::Inject { .. } => "inject",
        }
    }

    /// Fold `other` into `self`. A full reload absorbs everything.
    fn merge(self, other: &ReloadSignal) -> ReloadSignal {
        match (self, other) {
            (ReloadSignal::Inject { mut paths }, ReloadSignal::Inject { paths: more }) => {
                for p in more {
                    if !paths.contains(p) {
                        paths.push(p.clone());
                    }
                }
                ReloadSignal::Inject { paths }
            }
            _ => ReloadSignal::Reload,
        }
    }
}

#[derive(Debug, Default)]
struct ReloadLog {
    seq: u64,
    history: VecDeque<(u64, ReloadSignal)>,
}

impl ReloadLog {
    /// Merged signal for everything after `since`, if anything happened.
    fn collect_after(&self, since: u64) -> Option<ReloadSignal> {
        if since >= self.seq {
            return None;
        }
        // The client missed entries that fell out of the history.
        let oldest = self.history.front().map_or(self.seq, |(s, _)| *s);
        if since + 1 < oldest {
            return Some(ReloadSignal::Reload);
        }
        let mut pending = self
            .history
            .iter()
            .filter(|(s, _)| *s > since)
            .map(|(_, sig)| sig);
        let first = pending.next()?.clone();
        Some(pending.fold(first, ReloadSignal::merge))
    }
}

/// Cloneable publisher/subscriber for reload signals.
#[derive(Debug, Clone, Default)]
pub struct ReloadHandle {
    inner: Arc<(Mutex<ReloadLog>, Condvar)>,
}

impl ReloadHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ReloadLog> {
        self.inner.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sequence number of the latest signal (0 if none was sent).
    pub fn seq(&self) -> u64 {
        self.lock().seq
    }

    /// Publish a signal and wake all waiting clients. Returns its sequence
    /// number.
    pub fn send(&self, signal: ReloadSignal) -> u64 {
        let mut log = self.lock();
        log.seq += 1;
        let seq = log.seq;
        debug!(seq, kind = signal.kind(), "reload signal");
        log.history.push_back((seq, signal));
        while log.history.len() > HISTORY_LEN {
            log.history.pop_front();
        }
        drop(log);
        self.inner.1.notify_all();
        seq
    }

    /// Full page reload.
    pub fn reload(&self) -> u64 {
        self.send(ReloadSignal::Reload)
    }

    /// Announce freshly written files. Stylesheets alone are injected; any
    /// other file forces a reload. An empty list sends nothing.
    pub fn stream<I, S>(&self, paths: I) -> Option<u64>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        if paths.is_empty() {
            return None;
        }
        let signal = if paths.iter().all(|p| p.ends_with(".css")) {
            ReloadSignal::Inject { paths }
        } else {
            ReloadSignal::Reload
        };
        Some(self.send(signal))
    }

    /// Merged signal for everything published after `since`, without
    /// blocking.
    pub fn pending(&self, since: u64) -> Option<(u64, ReloadSignal)> {
        let log = self.lock();
        log.collect_after(since).map(|sig| (log.seq, sig))
    }

    /// Block until something is published after `since` or `timeout`
    /// elapses. Returns the current sequence number and the merged signal.
    pub fn wait_after(&self, since: u64, timeout: Duration) -> (u64, Option<ReloadSignal>) {
        let deadline = Instant::now() + timeout;
        let mut log = self.lock();
        loop {
            if let Some(sig) = log.collect_after(since) {
                return (log.seq, Some(sig));
            }
            let now = Instant::now();
            if now >= deadline {
                return (log.seq, None);
            }
            log = self
                .inner
                .1
                .wait_timeout(log, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }
}
