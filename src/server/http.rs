// src/server/http.rs

//! Request handling for the dev server, independent of the socket layer.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::fs::FileSystem;
use crate::server::listing::render_listing;
use crate::server::reload::{ReloadHandle, ReloadSignal};

/// Long-poll endpoint used by the injected client script.
pub const POLL_PATH: &str = "/__sitepipe/poll";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
}

impl Method {
    pub fn from_http(method: &tiny_http::Method) -> Option<Self> {
        match method {
            tiny_http::Method::Get => Some(Self::Get),
            tiny_http::Method::Head => Some(Self::Head),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status_code: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub headers: Vec<(&'static str, String)>,
}

impl Reply {
    pub fn text(status_code: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status_code,
            content_type: "text/plain; charset=utf-8",
            body: body.into(),
            headers: Vec::new(),
        }
    }

    fn html(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status_code: 200,
            content_type: "text/html; charset=utf-8",
            body: body.into(),
            headers: Vec::new(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Serves files from the output directory.
#[derive(Debug, Clone)]
pub struct StaticSite {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    directory_listing: bool,
    reload: ReloadHandle,
}

impl StaticSite {
    pub fn new(
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        directory_listing: bool,
        reload: ReloadHandle,
    ) -> Self {
        Self {
            root: root.into(),
            fs,
            directory_listing,
            reload,
        }
    }

    pub fn reload(&self) -> &ReloadHandle {
        &self.reload
    }

    /// Answer a static-file request. `if_none_match` is the raw header.
    pub fn handle(&self, method: Method, url: &str, if_none_match: Option<&str>) -> Reply {
        let (path, _query) = split_url(url);
        let Some(decoded) = percent_decode(path) else {
            return Reply::text(400, "bad request\n");
        };
        let Some(target) = resolve(&self.root, &decoded) else {
            return Reply::text(403, "forbidden\n");
        };

        let mut reply = if self.fs.is_dir(&target) {
            if !decoded.ends_with('/') {
                let mut r = Reply::text(301, "");
                r.headers.push(("Location", format!("{path}/")));
                return r;
            }
            let index = target.join("index.html");
            if self.fs.is_file(&index) {
                self.serve_file(&index)
            } else if self.directory_listing {
                match render_listing(self.fs.as_ref(), &target, &decoded) {
                    Ok(html) => Reply::html(self.inject_client(html.into_bytes())),
                    Err(e) => Reply::text(500, format!("{e}\n")),
                }
            } else {
                Reply::text(404, "not found\n")
            }
        } else if self.fs.is_file(&target) {
            self.serve_file(&target)
        } else {
            Reply::text(404, "not found\n")
        };

        if reply.status_code == 200 {
            let etag = format!("\"{}\"", blake3::hash(&reply.body).to_hex());
            if if_none_match.is_some_and(|v| etag_matches(v, &etag)) {
                reply = Reply::text(304, "");
            }
            reply.headers.push(("ETag", etag));
            reply.headers.push(("Cache-Control", "no-cache".to_string()));
        }
        if method == Method::Head {
            reply.body.clear();
        }
        debug!(url, status = reply.status_code, "served");
        reply
    }

    fn serve_file(&self, path: &Path) -> Reply {
        let body = match self.fs.read(path) {
            Ok(b) => b,
            Err(e) => return Reply::text(500, format!("{e}\n")),
        };
        let content_type = content_type_for(path);
        let body = if content_type.starts_with("text/html") {
            self.inject_client(body)
        } else {
            body
        };
        Reply {
            status_code: 200,
            content_type,
            body,
            headers: Vec::new(),
        }
    }

    /// Add the live-reload client before `</body>`, or at the end.
    fn inject_client(&self, mut html: Vec<u8>) -> Vec<u8> {
        let script = client_script(self.reload.seq());
        let lower = String::from_utf8_lossy(&html).to_ascii_lowercase();
        match lower.rfind("</body>") {
            Some(pos) if lower.len() == html.len() => {
                html.splice(pos..pos, script.into_bytes());
            }
            _ => html.extend_from_slice(script.as_bytes()),
        }
        html
    }

    /// Answer a long-poll request: block until a signal newer than
    /// `since` is published or `timeout` passes.
    ///
    /// Body: `SEQ\nKIND[\nPATH...]`, where KIND is `reload`, `inject` or
    /// `none`.
    pub fn handle_poll(&self, url: &str, timeout: Duration) -> Reply {
        let (_, query) = split_url(url);
        let since = query
            .split('&')
            .filter_map(|kv| kv.split_once('='))
            .find(|(k, _)| *k == "since")
            .and_then(|(_, v)| v.parse::<u64>().ok())
            .unwrap_or_else(|| self.reload.seq());

        let (seq, signal) = self.reload.wait_after(since, timeout);
        let body = match signal {
            None => format!("{seq}\nnone"),
            Some(ReloadSignal::Reload) => format!("{seq}\nreload"),
            Some(ReloadSignal::Inject { paths }) => format!("{seq}\ninject\n{}", paths.join("\n")),
        };
        let mut reply = Reply::text(200, body);
        reply.headers.push(("Cache-Control", "no-store".to_string()));
        reply
    }
}

fn split_url(url: &str) -> (&str, &str) {
    url.split_once('?').unwrap_or((url, ""))
}

fn etag_matches(header: &str, etag: &str) -> bool {
    header
        .split(',')
        .map(|v| v.trim().trim_start_matches("W/"))
        .any(|v| v == "*" || v == etag)
}

/// Decode `%XX` escapes. Returns `None` for malformed escapes or non-UTF-8
/// results.
pub fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Map a decoded URL path onto `root`. `None` if it tries to leave the root.
fn resolve(root: &Path, url_path: &str) -> Option<PathBuf> {
    let mut target = root.to_path_buf();
    for segment in url_path.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            s if s.contains('\\') || s.contains('\0') => return None,
            s => target.push(s),
        }
    }
    Some(target)
}

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

fn client_script(seq: u64) -> String {
    format!(
        r#"<script>(function(){{var seq={seq};function poll(){{fetch("{POLL_PATH}?since="+seq,{{cache:"no-store"}}).then(function(r){{return r.text();}}).then(function(t){{var l=t.split("\n");seq=parseInt(l[0],10)||seq;if(l[1]==="reload"){{location.reload();return;}}if(l[1]==="inject"){{l.slice(2).forEach(function(p){{document.querySelectorAll('link[rel="stylesheet"]').forEach(function(el){{if(el.href.split("?")[0].endsWith(p)){{el.href=el.href.split("?")[0]+"?v="+seq;}}}});}});}}poll();}}).catch(function(){{setTimeout(poll,1000);}});}}poll();}})();</script>"#
    )
}
