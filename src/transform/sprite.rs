// src/transform/sprite.rs

//! SVG sprite packing.
//!
//! Both packers consume a stream of icon SVGs (paths relative to the sprite
//! source directory) and emit two assets relative to the output root: the
//! sprite document and a stylesheet addressing each icon by class.
//!
//! - [`CssSprite`]: icons laid out in a vertical strip inside one SVG, the
//!   stylesheet uses `background-position` offsets.
//! - [`SymbolSprite`]: one `<symbol id="NAME">` per icon, the stylesheet
//!   carries the icon dimensions.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use crate::errors::{PipelineError, Result};
use crate::transform::svg::{attributes, push_attribute};
use crate::transform::{Asset, Transform};

const SVG_NS: &str = r#"xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink""#;

/// A parsed icon: root attributes split out, inner markup kept verbatim.
#[derive(Debug, Clone)]
pub struct Icon {
    pub name: String,
    pub width: f64,
    pub height: f64,
    /// `min-x min-y width height`.
    pub view_box: [f64; 4],
    /// Root attributes other than sizing, namespace and position.
    pub extra_attrs: Vec<(String, String)>,
    pub inner: String,
}

impl Icon {
    pub fn parse(rel_path: &Path, svg: &str, stage: &'static str) -> Result<Self> {
        let err = |msg: &str| PipelineError::transform(stage, rel_path, msg.to_string());
        let xml_err = |e: quick_xml::Error| err(&e.to_string());
        let mut reader = Reader::from_str(svg);

        let (root, self_closing) = loop {
            match reader.read_event().map_err(xml_err)? {
                Event::Start(tag) if tag.name().as_ref() == b"svg" => break (tag, false),
                Event::Empty(tag) if tag.name().as_ref() == b"svg" => break (tag, true),
                Event::Eof => return Err(err("no <svg> root element")),
                _ => {}
            }
        };

        let mut width = None;
        let mut height = None;
        let mut view_box = None;
        let mut extra_attrs = Vec::new();
        for (name, value) in attributes(&root).map_err(xml_err)? {
            match name.as_str() {
                "width" => width = parse_length(&value),
                "height" => height = parse_length(&value),
                "viewBox" => view_box = parse_view_box(&value),
                "x" | "y" | "xmlns" | "version" => {}
                n if n.starts_with("xmlns:") => {}
                _ => extra_attrs.push((name, value)),
            }
        }

        let (width, height, view_box) = match (width, height, view_box) {
            (Some(w), Some(h), Some(vb)) => (w, h, vb),
            (Some(w), Some(h), None) => (w, h, [0.0, 0.0, w, h]),
            (w, h, Some(vb)) => (w.unwrap_or(vb[2]), h.unwrap_or(vb[3]), vb),
            _ => return Err(err("icon has neither width/height nor viewBox")),
        };
        if width <= 0.0 || height <= 0.0 {
            return Err(err("icon has zero size"));
        }

        let inner = if self_closing {
            String::new()
        } else {
            let end = root.to_end().into_owned();
            let span = reader
                .read_to_end(end.name())
                .map_err(|e| err(&format!("unterminated <svg> root element: {e}")))?;
            svg[span.start as usize..span.end as usize].trim().to_string()
        };

        Ok(Self {
            name: icon_name(rel_path),
            width,
            height,
            view_box,
            extra_attrs,
            inner,
        })
    }

    fn attrs_string(&self) -> String {
        self.extra_attrs
            .iter()
            .fold(String::new(), |mut acc, (k, v)| {
                push_attribute(&mut acc, k, v);
                acc
            })
    }
}

/// Parse `24`, `24px` or `24.5`. Relative units are not supported.
fn parse_length(value: &str) -> Option<f64> {
    let v = value.trim();
    let v = v.strip_suffix("px").unwrap_or(v);
    v.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_view_box(value: &str) -> Option<[f64; 4]> {
    let nums: Vec<f64> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    match nums.as_slice() {
        [x, y, w, h] if *w > 0.0 && *h > 0.0 => Some([*x, *y, *w, *h]),
        _ => None,
    }
}

/// Icon name from its path: file stem, with sub-directories joined by `--`
/// and anything outside `[A-Za-z0-9_-]` replaced by `-`.
pub fn icon_name(rel_path: &Path) -> String {
    let stemmed = rel_path.with_extension("");
    stemmed
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .map(|part| {
            part.chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                        c
                    } else {
                        '-'
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("--")
}

/// Format a number without a trailing `.0`.
fn num(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        let s = format!("{n:.3}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

fn parse_icons(stage: &'static str, assets: &[Asset]) -> Result<Vec<Icon>> {
    let mut seen = BTreeSet::new();
    let mut icons = Vec::with_capacity(assets.len());
    for asset in assets.iter().filter(|a| a.has_extension("svg")) {
        let icon = Icon::parse(&asset.rel_path, asset.text(stage)?, stage)?;
        if !seen.insert(icon.name.clone()) {
            return Err(PipelineError::transform(
                stage,
                &asset.rel_path,
                format!("duplicate icon name `{}`", icon.name),
            ));
        }
        icons.push(icon);
    }
    Ok(icons)
}

/// Relative URL from `css_path` to `sprite_path`, both relative to the
/// output root.
fn sprite_url(css_path: &Path, sprite_path: &Path) -> String {
    let depth = css_path.parent().map_or(0, |p| p.components().count());
    let mut url = "../".repeat(depth);
    url.push_str(&sprite_path.to_string_lossy().replace('\\', "/"));
    url
}

/// Background-position sprite.
#[derive(Debug, Clone)]
pub struct CssSprite {
    padding: u32,
    prefix: String,
    sprite_path: PathBuf,
    css_path: PathBuf,
}

impl CssSprite {
    pub fn new(padding: u32, prefix: impl Into<String>) -> Self {
        Self {
            padding,
            prefix: prefix.into(),
            sprite_path: PathBuf::from("sprite-unchanged.svg"),
            css_path: PathBuf::from("styles").join("svg-sprite-unchanged.css"),
        }
    }

    pub fn with_outputs(mut self, sprite: impl Into<PathBuf>, css: impl Into<PathBuf>) -> Self {
        self.sprite_path = sprite.into();
        self.css_path = css.into();
        self
    }

    pub fn pack(&self, icons: &[Icon]) -> (String, String) {
        let p = f64::from(self.padding);
        let url = sprite_url(&self.css_path, &self.sprite_path);
        let sprite_width = icons.iter().map(|i| i.width).fold(0.0, f64::max) + 2.0 * p;

        let mut body = String::new();
        let mut css = String::new();
        let mut y = 0.0;
        for icon in icons {
            let (ix, iy) = (p, y + p);
            let vb = icon.view_box;
            let _ = write!(
                body,
                r#"<svg{} width="{}" height="{}" x="{}" y="{}" viewBox="{} {} {} {}">{}</svg>"#,
                icon.attrs_string(),
                num(icon.width),
                num(icon.height),
                num(ix),
                num(iy),
                num(vb[0]),
                num(vb[1]),
                num(vb[2]),
                num(vb[3]),
                icon.inner,
            );
            let _ = writeln!(
                css,
                "{}{} {{\n\tbackground: url(\"{url}\") no-repeat;\n\tbackground-position: {}px {}px;\n\twidth: {}px;\n\theight: {}px;\n}}\n",
                self.prefix,
                icon.name,
                num(-ix),
                num(-iy),
                num(icon.width),
                num(icon.height),
            );
            y += icon.height + 2.0 * p;
        }

        let sprite = format!(
            r#"<svg {SVG_NS} width="{}" height="{}" viewBox="0 0 {} {}">{body}</svg>"#,
            num(sprite_width),
            num(y),
            num(sprite_width),
            num(y),
        );
        (sprite, css)
    }
}

impl Transform for CssSprite {
    fn name(&self) -> &'static str {
        "css-sprite"
    }

    fn apply(&self, assets: Vec<Asset>) -> Result<Vec<Asset>> {
        let icons = parse_icons(self.name(), &assets)?;
        if icons.is_empty() {
            debug!("no icons; css sprite not generated");
            return Ok(Vec::new());
        }
        let (sprite, css) = self.pack(&icons);
        debug!(icons = icons.len(), sprite = ?self.sprite_path, "css sprite packed");
        Ok(vec![
            Asset::new(self.sprite_path.clone(), sprite),
            Asset::new(self.css_path.clone(), css),
        ])
    }
}

/// `<symbol>` sprite for `<use xlink:href="sprite.svg#NAME">`.
#[derive(Debug, Clone)]
pub struct SymbolSprite {
    padding: u32,
    prefix: String,
    sprite_path: PathBuf,
    css_path: PathBuf,
}

impl SymbolSprite {
    pub fn new(padding: u32, prefix: impl Into<String>) -> Self {
        Self {
            padding,
            prefix: prefix.into(),
            sprite_path: PathBuf::from("sprite.svg"),
            css_path: PathBuf::from("styles").join("svg-sprite.css"),
        }
    }

    pub fn with_outputs(mut self, sprite: impl Into<PathBuf>, css: impl Into<PathBuf>) -> Self {
        self.sprite_path = sprite.into();
        self.css_path = css.into();
        self
    }

    pub fn pack(&self, icons: &[Icon]) -> (String, String) {
        let p = f64::from(self.padding);
        let mut body = String::new();
        let mut css = String::new();
        for icon in icons {
            // Padding is given in pixels; convert to viewBox units.
            let [vx, vy, vw, vh] = icon.view_box;
            let (px, py) = (p * vw / icon.width, p * vh / icon.height);
            let _ = write!(
                body,
                r#"<symbol id="{}"{} viewBox="{} {} {} {}">{}</symbol>"#,
                icon.name,
                icon.attrs_string(),
                num(vx - px),
                num(vy - py),
                num(vw + 2.0 * px),
                num(vh + 2.0 * py),
                icon.inner,
            );
            let _ = writeln!(
                css,
                "{}{} {{\n\twidth: {}px;\n\theight: {}px;\n}}\n",
                self.prefix,
                icon.name,
                num(icon.width + 2.0 * p),
                num(icon.height + 2.0 * p),
            );
        }
        (format!("<svg {SVG_NS}>{body}</svg>"), css)
    }
}

impl Transform for SymbolSprite {
    fn name(&self) -> &'static str {
        "symbol-sprite"
    }

    fn apply(&self, assets: Vec<Asset>) -> Result<Vec<Asset>> {
        let icons = parse_icons(self.name(), &assets)?;
        if icons.is_empty() {
            debug!("no icons; symbol sprite not generated");
            return Ok(Vec::new());
        }
        let (sprite, css) = self.pack(&icons);
        debug!(icons = icons.len(), sprite = ?self.sprite_path, "symbol sprite packed");
        Ok(vec![
            Asset::new(self.sprite_path.clone(), sprite),
            Asset::new(self.css_path.clone(), css),
        ])
    }
}
