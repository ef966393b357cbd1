// src/transform/svg.rs

//! SVG collaborators: minification (optionally pretty-printed), attribute
//! stripping for recolourable icons, and plain text replacement.
//!
//! Documents are read with `quick-xml`. Attribute values are kept exactly as
//! written (entities and inner whitespace included); only the whitespace
//! between attributes is normalised.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::errors::{PipelineError, Result};
use crate::transform::{map_each, Asset, Transform};

/// Editor-only elements dropped by the minifier, with their content.
const EDITOR_ELEMENTS: &[&[u8]] = &[b"metadata", b"title", b"desc", b"sodipodi:namedview"];

/// One piece of a minified document.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Open(String),
    Empty(String),
    Close(String),
    Text(String),
}

impl Piece {
    fn as_str(&self) -> &str {
        match self {
            Piece::Open(s) | Piece::Empty(s) | Piece::Close(s) | Piece::Text(s) => s,
        }
    }
}

/// Attributes of a tag, in document order, values unescaped as written.
pub(crate) fn attributes(
    tag: &BytesStart<'_>,
) -> std::result::Result<Vec<(String, String)>, quick_xml::Error> {
    tag.attributes()
        .map(|attr| {
            let attr = attr?;
            Ok((
                lossy(attr.key.as_ref()).into_owned(),
                lossy(&attr.value).into_owned(),
            ))
        })
        .collect()
}

/// Append ` key="value"`, falling back to single quotes when the value
/// holds a double quote.
pub(crate) fn push_attribute(out: &mut String, key: &str, value: &str) {
    let quote = if value.contains('"') { '\'' } else { '"' };
    out.push(' ');
    out.push_str(key);
    out.push('=');
    out.push(quote);
    out.push_str(value);
    out.push(quote);
}

fn render_tag(name: &str, attrs: &[(String, String)], self_closing: bool) -> String {
    let mut out = String::with_capacity(name.len() + 2 + attrs.len() * 16);
    out.push('<');
    out.push_str(name);
    for (key, value) in attrs {
        push_attribute(&mut out, key, value);
    }
    out.push_str(if self_closing { "/>" } else { ">" });
    out
}

fn lossy(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Minify an SVG document: drop prolog, comments and editor metadata,
/// rewrite tags with single spaces between attributes, and drop
/// whitespace-only text between tags.
pub fn minify(svg: &str, pretty: bool) -> std::result::Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(svg);
    let mut pieces = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(tag) => {
                if EDITOR_ELEMENTS.contains(&tag.name().as_ref()) {
                    let end = tag.to_end().into_owned();
                    reader.read_to_end(end.name())?;
                    continue;
                }
                let name = lossy(tag.name().as_ref()).into_owned();
                pieces.push(Piece::Open(render_tag(&name, &attributes(&tag)?, false)));
            }
            Event::Empty(tag) => {
                if EDITOR_ELEMENTS.contains(&tag.name().as_ref()) {
                    continue;
                }
                let name = lossy(tag.name().as_ref()).into_owned();
                pieces.push(Piece::Empty(render_tag(&name, &attributes(&tag)?, true)));
            }
            Event::End(tag) => {
                pieces.push(Piece::Close(format!("</{}>", lossy(tag.name().as_ref()))));
            }
            Event::Text(text) => {
                let collapsed = collapse_whitespace(&lossy(&text));
                if !collapsed.is_empty() {
                    pieces.push(Piece::Text(collapsed));
                }
            }
            Event::CData(data) => {
                pieces.push(Piece::Text(format!("<![CDATA[{}]]>", lossy(&data))));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(if pretty {
        pretty_print(&pieces)
    } else {
        pieces.iter().map(Piece::as_str).collect()
    })
}

/// One piece per line, indented by nesting depth.
fn pretty_print(pieces: &[Piece]) -> String {
    let mut out = String::new();
    let mut depth: usize = 0;
    for piece in pieces {
        if matches!(piece, Piece::Close(_)) {
            depth = depth.saturating_sub(1);
        }
        out.push_str(&"    ".repeat(depth));
        out.push_str(piece.as_str());
        out.push('\n');
        if matches!(piece, Piece::Open(_)) {
            depth += 1;
        }
    }
    out
}

/// Remove the named attributes from every element.
///
/// Only exact names match: stripping `fill` keeps `fill-rule`,
/// `fill-opacity` and `stroke`. Tags that lose nothing, and everything
/// between tags, are copied through untouched.
pub fn strip_attributes(
    svg: &str,
    names: &[&str],
) -> std::result::Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(svg);
    let mut out = String::with_capacity(svg.len());
    let mut start = 0;

    loop {
        let event = reader.read_event()?;
        let end = reader.buffer_position() as usize;
        let (tag, self_closing) = match event {
            Event::Start(tag) => (tag, false),
            Event::Empty(tag) => (tag, true),
            Event::Eof => break,
            _ => {
                out.push_str(&svg[start..end]);
                start = end;
                continue;
            }
        };

        let attrs = attributes(&tag)?;
        let kept: Vec<_> = attrs
            .iter()
            .filter(|(key, _)| !names.contains(&key.as_str()))
            .cloned()
            .collect();
        if kept.len() == attrs.len() {
            out.push_str(&svg[start..end]);
        } else {
            let name = lossy(tag.name().as_ref()).into_owned();
            out.push_str(&render_tag(&name, &kept, self_closing));
        }
        start = end;
    }
    out.push_str(&svg[start..]);
    Ok(out)
}

fn svg_error(stage: &'static str, asset: &Asset, err: quick_xml::Error) -> PipelineError {
    PipelineError::transform(stage, &asset.rel_path, err.to_string())
}

/// SVG minifier stage. Non-SVG assets pass through.
#[derive(Debug, Clone, Default)]
pub struct SvgMinify {
    pretty: bool,
}

impl SvgMinify {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit one tag per line instead of a single line.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Transform for SvgMinify {
    fn name(&self) -> &'static str {
        "svg-minify"
    }

    fn apply(&self, assets: Vec<Asset>) -> Result<Vec<Asset>> {
        map_each(assets, |asset| {
            if !asset.has_extension("svg") {
                return Ok(asset);
            }
            let min = minify(asset.text(self.name())?, self.pretty)
                .map_err(|e| svg_error(self.name(), &asset, e))?;
            Ok(asset.with_contents(min))
        })
    }
}

/// Strips attributes by exact name from every element of SVG assets.
#[derive(Debug, Clone)]
pub struct StripAttributes {
    names: Vec<&'static str>,
}

impl StripAttributes {
    pub fn new(names: &[&'static str]) -> Self {
        Self {
            names: names.to_vec(),
        }
    }

    /// `fill` and `style` go so icons pick up colour from the page;
    /// `stroke` stays because some icons draw their geometry with it.
    pub fn recolourable() -> Self {
        Self::new(&["fill", "style"])
    }
}

impl Transform for StripAttributes {
    fn name(&self) -> &'static str {
        "strip-attributes"
    }

    fn apply(&self, assets: Vec<Asset>) -> Result<Vec<Asset>> {
        map_each(assets, |asset| {
            if !asset.has_extension("svg") {
                return Ok(asset);
            }
            let stripped = strip_attributes(asset.text(self.name())?, &self.names)
                .map_err(|e| svg_error(self.name(), &asset, e))?;
            Ok(asset.with_contents(stripped))
        })
    }
}

/// Literal text replacement over every asset.
#[derive(Debug, Clone)]
pub struct Replace {
    from: String,
    to: String,
}

impl Replace {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Undo `&gt;` escaping left behind by DOM re-serialisation.
    pub fn unescape_gt() -> Self {
        Self::new("&gt;", ">")
    }
}

impl Transform for Replace {
    fn name(&self) -> &'static str {
        "replace"
    }

    fn apply(&self, assets: Vec<Asset>) -> Result<Vec<Asset>> {
        map_each(assets, |asset| {
            let replaced = asset.text(self.name())?.replace(&self.from, &self.to);
            Ok(asset.with_contents(replaced))
        })
    }
}
