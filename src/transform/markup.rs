// src/transform/markup.rs

//! Inclusion-marker resolution for HTML pages.
//!
//! A marker looks like:
//!
//! ```html
//! <!-- inject:parts/header.html -->
//! ```
//!
//! and may be closed by `<!-- endinject -->`, in which case everything up to
//! and including the end tag is replaced. The path token is compared against
//! the include library's paths (relative to the source root). Tokens written
//! as absolute project paths (`/src/parts/header.html`) resolve by their
//! trailing components. Markers with no match are left untouched.
//!
//! Resolution is a single pass: markers inside included content are not
//! expanded, so rebuilding from unchanged sources gives identical output.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::errors::Result;
use crate::transform::{map_each, Asset, Transform};

static START_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*inject:\s*([^\s>]+?)\s*-->").expect("valid start tag regex")
});

static END_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!--\s*endinject\s*-->").expect("valid end tag regex"));

/// Replaces inclusion markers with the literal contents of library files.
#[derive(Debug, Clone, Default)]
pub struct Inject {
    /// Include library keyed by source-relative path.
    library: BTreeMap<String, String>,
}

impl Inject {
    pub fn new<I>(library: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            library: library.into_iter().collect(),
        }
    }

    /// Find the library entry a marker token refers to.
    fn lookup(&self, token: &str) -> Option<&str> {
        let token = normalize_token(token);
        if let Some(hit) = self.library.get(token) {
            return Some(hit.as_str());
        }
        // `/src/parts/a.html` style: match on whole trailing components.
        self.library
            .iter()
            .find(|(rel, _)| {
                token.len() > rel.len()
                    && token.ends_with(rel.as_str())
                    && token.as_bytes()[token.len() - rel.len() - 1] == b'/'
            })
            .map(|(_, contents)| contents.as_str())
    }

    /// Resolve all markers in `html`. Returns the new text and how many
    /// markers were replaced.
    pub fn resolve(&self, html: &str) -> (String, usize) {
        let mut out = String::with_capacity(html.len());
        let mut cursor = 0;
        let mut replaced = 0;

        while let Some(caps) = START_TAG.captures_at(html, cursor) {
            let Some(whole) = caps.get(0) else { break };
            let token = caps.get(1).map_or("", |m| m.as_str());

            // The span covers an optional body + end tag, but only if the end
            // tag comes before the next start tag.
            let mut span_end = whole.end();
            if let Some(end) = END_TAG.find_at(html, whole.end()) {
                let next_start = START_TAG.find_at(html, whole.end()).map(|m| m.start());
                if next_start.is_none_or(|ns| end.start() < ns) {
                    span_end = end.end();
                }
            }

            out.push_str(&html[cursor..whole.start()]);
            match self.lookup(token) {
                Some(contents) => {
                    debug!(token, "resolved inclusion marker");
                    out.push_str(contents);
                    replaced += 1;
                }
                None => {
                    debug!(token, "no file matches inclusion marker; leaving it as-is");
                    out.push_str(&html[whole.start()..span_end]);
                }
            }
            cursor = span_end;
        }

        out.push_str(&html[cursor..]);
        (out, replaced)
    }
}

fn normalize_token(token: &str) -> &str {
    let mut t = token.trim();
    loop {
        if let Some(rest) = t.strip_prefix("./") {
            t = rest;
        } else if let Some(rest) = t.strip_prefix('/') {
            t = rest;
        } else {
            return t;
        }
    }
}

impl Transform for Inject {
    fn name(&self) -> &'static str {
        "inject"
    }

    fn apply(&self, assets: Vec<Asset>) -> Result<Vec<Asset>> {
        map_each(assets, |asset| {
            let (html, replaced) = self.resolve(asset.text(self.name())?);
            debug!(file = ?asset.rel_path, replaced, "markup resolved");
            Ok(asset.with_contents(html))
        })
    }
}
