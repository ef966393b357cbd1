// tests/sprites.rs

mod common;
use crate::common::{init_tracing, mock_context};

use std::error::Error;
use std::path::Path;

use sitepipe::errors::PipelineError;
use sitepipe::fs::mock::MockFileSystem;
use sitepipe::tasks::{SpriteColorized, SpriteUnchanged, Task, TaskOutcome};
use sitepipe::transform::svg::{minify, strip_attributes};
use sitepipe::transform::sprite::Icon;
use sitepipe::transform::{Asset, CssSprite, Transform};

type TestResult = Result<(), Box<dyn Error>>;

const COLORED_ICON: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<!-- exported by an editor -->
<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" style="background:#fff">
  <title>Bell</title>
  <path fill="#f00" style="opacity:.5" stroke="#000" fill-rule="evenodd" d="M0 0h24v24z"/>
  <g fill='blue'>
    <circle cx="12" cy="12" r="4" stroke-width="2" stroke="red"/>
  </g>
  <text x="1" y="20">1 &gt; 0</text>
</svg>
"##;

const PLAIN_ICON: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 16 8"><rect width="16" height="8" fill="#0f0"/></svg>"##;

#[test]
fn colorized_sprite_strips_fill_and_style_but_keeps_stroke() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("src/img/svg-sprites/colorized/bell.svg", COLORED_ICON);

    let outcome = SpriteColorized.run(&mock_context(&fs))?;
    assert_eq!(outcome, TaskOutcome::Success { written: 2 });

    let sprite = fs.contents("dist/sprite.svg").expect("sprite written");
    let css = fs.contents("dist/styles/svg-sprite.css").expect("stylesheet written");

    assert!(sprite.contains(r#"<symbol id="bell""#), "{sprite}");
    assert!(!sprite.contains(" fill="), "{sprite}");
    assert!(!sprite.contains(" style="), "{sprite}");
    assert!(sprite.contains(r##"stroke="#000""##), "{sprite}");
    assert!(sprite.contains(r#"stroke="red""#), "{sprite}");
    assert!(sprite.contains(r#"stroke-width="2""#), "{sprite}");
    assert!(sprite.contains(r#"fill-rule="evenodd""#), "{sprite}");
    assert!(!sprite.contains("&gt;") && !css.contains("&gt;"));
    assert!(!sprite.contains("<title>"), "{sprite}");

    assert!(css.contains(".svg-bell {"), "{css}");
    assert!(css.contains("width: 44px;"), "{css}");
    Ok(())
}

#[test]
fn unchanged_sprite_uses_background_positions() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("src/img/svg-sprites/unchanged/a.svg", COLORED_ICON);
    fs.add_file("src/img/svg-sprites/unchanged/b.svg", PLAIN_ICON);

    SpriteUnchanged.run(&mock_context(&fs))?;

    let sprite = fs.contents("dist/sprite-unchanged.svg").expect("sprite written");
    let css = fs
        .contents("dist/styles/svg-sprite-unchanged.css")
        .expect("stylesheet written");

    // Icons keep their colours.
    assert!(sprite.contains(r##"fill="#0f0""##), "{sprite}");
    assert!(sprite.contains(r#"width="44" height="72""#), "{sprite}");

    assert!(css.contains(".svg-u-a {"), "{css}");
    assert!(css.contains(r#"url("../sprite-unchanged.svg")"#), "{css}");
    assert!(css.contains("background-position: -10px -10px;"), "{css}");
    assert!(css.contains(".svg-u-b {"), "{css}");
    assert!(css.contains("background-position: -10px -54px;"), "{css}");
    assert!(css.contains("width: 16px;\n\theight: 8px;"), "{css}");
    Ok(())
}

#[test]
fn nested_icons_are_named_by_path() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("src/img/svg-sprites/colorized/social/fb icon.svg", PLAIN_ICON);

    SpriteColorized.run(&mock_context(&fs))?;
    let sprite = fs.contents("dist/sprite.svg").expect("sprite written");
    assert!(sprite.contains(r#"<symbol id="social--fb-icon""#), "{sprite}");
    Ok(())
}

#[test]
fn no_icons_writes_nothing() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_dir("src/img");
    let outcome = SpriteUnchanged.run(&mock_context(&fs))?;
    assert_eq!(outcome, TaskOutcome::Success { written: 0 });
    assert!(fs.contents("dist/sprite-unchanged.svg").is_none());
    Ok(())
}

#[test]
fn icon_without_size_is_a_transform_error() {
    let err = CssSprite::new(10, ".svg-u-")
        .apply(vec![Asset::new("odd.svg", "<svg><path d=\"M0 0\"/></svg>")])
        .unwrap_err();
    assert!(matches!(err, PipelineError::Transform { stage: "css-sprite", .. }), "{err:?}");
}

#[test]
fn strip_only_touches_exact_attribute_names() -> TestResult {
    let svg = r#"<svg><path fill="red" fill-opacity=".5" stroke="blue" style="x"/></svg>"#;
    assert_eq!(
        strip_attributes(svg, &["fill", "style"])?,
        r#"<svg><path fill-opacity=".5" stroke="blue"/></svg>"#
    );
    Ok(())
}

#[test]
fn minify_drops_prolog_comments_and_whitespace() -> TestResult {
    let out = minify(COLORED_ICON, false)?;
    assert!(out.starts_with("<svg "), "{out}");
    assert!(!out.contains("<!--") && !out.contains("<?xml") && !out.contains("<title>"));
    assert!(!out.contains('\n'), "{out}");
    assert!(out.contains("<text x=\"1\" y=\"20\">1 &gt; 0</text>"), "{out}");
    Ok(())
}

#[test]
fn quoted_attribute_values_survive_untouched() -> TestResult {
    let svg = r#"<svg   aria-label="a >  b"
        data-x="x < y"  ><rect   title='say "hi"'  width="1"/></svg>"#;

    assert_eq!(
        minify(svg, false)?,
        r#"<svg aria-label="a >  b" data-x="x < y"><rect title='say "hi"' width="1"/></svg>"#
    );
    assert_eq!(
        strip_attributes(svg, &["width"])?,
        r#"<svg   aria-label="a >  b"
        data-x="x < y"  ><rect title='say "hi"'/></svg>"#
    );
    Ok(())
}

#[test]
fn pretty_minify_indents_by_depth() -> TestResult {
    let out = minify("<svg><g><rect/></g></svg>", true)?;
    assert_eq!(out, "<svg>\n    <g>\n        <rect/>\n    </g>\n</svg>\n");
    Ok(())
}

#[test]
fn quoted_brackets_in_icon_attributes_are_kept() -> TestResult {
    let icon = Icon::parse(
        Path::new("arrow.svg"),
        r#"<svg width="8" height="8" aria-label="1 > 0"><path d="M0 0"/></svg>"#,
        "css-sprite",
    )?;
    assert_eq!(icon.extra_attrs, vec![("aria-label".to_string(), "1 > 0".to_string())]);
    assert_eq!(icon.inner, r#"<path d="M0 0"/>"#);
    Ok(())
}
