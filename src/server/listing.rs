// src/server/listing.rs

use std::fmt::Write as _;
use std::path::Path;

use crate::fs::FileSystem;

/// HTML index of `dir`, directories first, then files, each sorted by name.
pub fn render_listing(fs: &dyn FileSystem, dir: &Path, url_path: &str) -> anyhow::Result<String> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in fs.read_dir(dir)? {
        let Some(name) = entry.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if fs.is_dir(&entry) {
            dirs.push(name);
        } else {
            files.push(name);
        }
    }
    dirs.sort();
    files.sort();

    let title = escape_html(url_path);
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Index of {title}</title></head>\n<body>\n<h1>Index of {title}</h1>\n<ul>\n"
    );
    if url_path != "/" {
        html.push_str("<li><a href=\"../\">../</a></li>\n");
    }
    for name in &dirs {
        let _ = writeln!(
            html,
            "<li><a href=\"{}/\">{}/</a></li>",
            encode_href(name),
            escape_html(name)
        );
    }
    for name in &files {
        let _ = writeln!(
            html,
            "<li><a href=\"{}\">{}</a></li>",
            encode_href(name),
            escape_html(name)
        );
    }
    html.push_str("</ul>\n</body>\n</html>\n");
    Ok(html)
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn encode_href(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for b in name.bytes() {
        if b.is_ascii_alphanumeric() || b"-._~".contains(&b) {
            out.push(b as char);
        } else {
            let _ = write!(out, "%{b:02X}");
        }
    }
    out
}
