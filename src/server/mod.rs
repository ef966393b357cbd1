// src/server/mod.rs

//! Development server for `watch` mode.
//!
//! Serves the output directory over HTTP on a dedicated thread and pushes
//! live-reload signals to open pages through a long-poll endpoint. Request
//! handling lives in [`http`] and does not touch sockets, so it is tested
//! directly.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;

pub mod http;
pub mod listing;
pub mod reload;

pub use http::{Method, Reply, StaticSite, POLL_PATH};
pub use reload::{ReloadHandle, ReloadSignal};

/// How long a poll request is held open before answering `none`.
const POLL_TIMEOUT: Duration = Duration::from_secs(25);

/// A running dev server. Dropping it stops the accept loop.
pub struct ServerHandle {
    addr: String,
    server: Arc<tiny_http::Server>,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle").field("addr", &self.addr).finish()
    }
}

impl ServerHandle {
    /// `host:port` actually bound.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.server.unblock();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Bind the configured address and start serving the output directory.
pub fn spawn_server(
    config: &PipelineConfig,
    fs: Arc<dyn FileSystem>,
    reload: ReloadHandle,
) -> Result<ServerHandle> {
    let settings = config.server();
    let addr = format!("{}:{}", settings.host, settings.port);
    let server = tiny_http::Server::http(&addr)
        .map_err(|e| PipelineError::Other(anyhow::anyhow!("binding dev server on {addr}: {e}")))?;
    let bound = server
        .server_addr()
        .to_ip()
        .map_or_else(|| addr.clone(), |a| a.to_string());
    let server = Arc::new(server);

    let site = Arc::new(StaticSite::new(
        config.output_root(),
        fs,
        settings.directory_listing,
        reload,
    ));

    let accept = Arc::clone(&server);
    let thread = thread::Builder::new()
        .name("sitepipe-server".to_string())
        .spawn(move || serve(&accept, &site))?;

    info!("dev server listening on http://{bound}/");
    Ok(ServerHandle {
        addr: bound,
        server,
        thread: Some(thread),
    })
}

fn serve(server: &tiny_http::Server, site: &Arc<StaticSite>) {
    for req in server.incoming_requests() {
        let Some(method) = Method::from_http(req.method()) else {
            let _ = req.respond(tiny_http::Response::empty(405));
            continue;
        };

        if req.url().starts_with(POLL_PATH) {
            // Polls block; keep them off the accept loop.
            let site = Arc::clone(site);
            let spawned = thread::Builder::new()
                .name("sitepipe-poll".to_string())
                .spawn(move || {
                    let reply = site.handle_poll(req.url(), POLL_TIMEOUT);
                    respond(req, reply);
                });
            if let Err(e) = spawned {
                warn!(error = %e, "could not spawn poll thread");
            }
            continue;
        }

        let if_none_match = req
            .headers()
            .iter()
            .find(|h| h.field.equiv("If-None-Match"))
            .map(|h| h.value.as_str().to_string());
        let reply = site.handle(method, req.url(), if_none_match.as_deref());
        respond(req, reply);
    }
    debug!("dev server accept loop finished");
}

fn respond(req: tiny_http::Request, reply: Reply) {
    let mut response = tiny_http::Response::from_data(reply.body).with_status_code(reply.status_code);
    let headers = std::iter::once(("Content-Type", reply.content_type.to_string())).chain(reply.headers);
    for (name, value) in headers {
        match tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(h) => response = response.with_header(h),
            Err(()) => warn!(header = name, "dropping invalid response header"),
        }
    }
    if let Err(e) = req.respond(response) {
        debug!(error = %e, "client went away before the response was sent");
    }
}
