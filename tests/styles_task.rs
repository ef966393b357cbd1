// tests/styles_task.rs

mod common;
use crate::common::builders::ProjectBuilder;
use crate::common::{init_tracing, mock_context};

use std::error::Error;

use sitepipe::fs::mock::MockFileSystem;
use sitepipe::server::ReloadSignal;
use sitepipe::tasks::{RenderStyles, Task, TaskOutcome};
use sitepipe::transform::{Asset, Concat, Prefix, Transform};

type TestResult = Result<(), Box<dyn Error>>;

fn position(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("{needle:?} not found in:\n{haystack}"))
}

#[test]
fn rules_follow_concatenation_order() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("src/parts/header/header.scss", ".part-rule { margin: 1px; }");
    fs.add_file("src/pages/home/home.scss", ".page-rule { padding: 2px; }");
    fs.add_file("src/styles/base.scss", ".global-rule { color: $brand; }");
    fs.add_file("src/styles/_variables.scss", "$brand: #123456;");

    let outcome = RenderStyles.run(&mock_context(&fs))?;
    assert_eq!(outcome, TaskOutcome::Success { written: 1 });

    let css = fs.contents("dist/styles/styles.css").expect("stylesheet written");
    assert!(css.contains("#123456"), "{css}");
    let global = position(&css, ".global-rule");
    let page = position(&css, ".page-rule");
    let part = position(&css, ".part-rule");
    assert!(global < page && page < part, "{css}");
    Ok(())
}

#[test]
fn compile_error_degrades_without_writing() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("src/styles/base.scss", ".a { color: $undefined; }");

    let outcome = RenderStyles.run(&mock_context(&fs))?;
    assert!(matches!(outcome, TaskOutcome::Degraded { .. }), "{outcome:?}");
    assert!(fs.contents("dist/styles/styles.css").is_none());
    Ok(())
}

#[test]
fn partials_import_through_the_styles_load_path() -> TestResult {
    let project = ProjectBuilder::new()
        .source("styles/mixins/_round.scss", "@mixin round { border-radius: 3px; }")
        .source("pages/home.scss", "@import 'mixins/round';\n.home { @include round; }")
        .build();

    let outcome = RenderStyles.run(&project.context())?;
    assert_eq!(outcome, TaskOutcome::Success { written: 1 });
    let css = project.read_output("styles/styles.css").expect("stylesheet");
    assert!(css.contains(".home"), "{css}");
    assert!(css.contains("border-radius"), "{css}");
    Ok(())
}

#[test]
fn prefixing_adds_vendor_declarations_and_keeps_order() -> TestResult {
    let css = Prefix::legacy_browsers()
        .prefix(".one { user-select: none; }\n.two { color: red; }\n")
        .map_err(|e| e.to_string())?;
    assert!(css.contains("-webkit-user-select"), "{css}");
    assert!(position(&css, ".one") < position(&css, ".two"));
    Ok(())
}

#[test]
fn concat_joins_in_stream_order() -> TestResult {
    let out = Concat::new("all.scss").apply(vec![
        Asset::new("a.scss", "a"),
        Asset::new("b.scss", "b\n"),
        Asset::new("c.scss", "c"),
    ])?;
    assert_eq!(out, vec![Asset::new("all.scss", "a\nb\nc")]);
    Ok(())
}

#[test]
fn no_sources_writes_nothing() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_dir("src");
    let outcome = RenderStyles.run(&mock_context(&fs))?;
    assert_eq!(outcome, TaskOutcome::Success { written: 0 });
    Ok(())
}

#[test]
fn prefixing_keeps_repeated_selectors_in_place() -> TestResult {
    let css = Prefix::legacy_browsers()
        .prefix(
            ".a{color:red} .b{color:blue} .a{color:red} \
             .x{display:flex} .y{color:green} .x{display:block}",
        )
        .map_err(|e| e.to_string())?;

    assert_eq!(css.matches(".a {").count(), 2, "{css}");
    assert_eq!(css.matches(".x {").count(), 2, "{css}");
    assert!(css.contains("display: flex"), "{css}");
    assert!(css.contains("display: block"), "{css}");
    assert!(position(&css, ".a {") < position(&css, ".b {"), "{css}");
    assert!(position(&css, "display: flex") < position(&css, ".y {"), "{css}");
    assert!(position(&css, ".y {") < position(&css, "display: block"), "{css}");
    Ok(())
}

#[test]
fn page_rule_overriding_a_global_rule_stays_after_it() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("src/styles/base.scss", ".card { color: red; }\n.other { margin: 0; }");
    fs.add_file("src/pages/home/home.scss", ".card { color: green; }");

    RenderStyles.run(&mock_context(&fs))?;

    let css = fs.contents("dist/styles/styles.css").expect("stylesheet written");
    assert_eq!(css.matches(".card {").count(), 2, "{css}");
    let global = position(&css, "red");
    let other = position(&css, ".other");
    let page = position(&css, "green");
    assert!(global < other && other < page, "{css}");
    Ok(())
}

#[test]
fn written_stylesheet_is_streamed_for_injection() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("src/styles/base.scss", ".a { color: red; }");
    let ctx = mock_context(&fs);

    RenderStyles.run(&ctx)?;
    assert_eq!(
        ctx.reload.pending(0),
        Some((
            1,
            ReloadSignal::Inject {
                paths: vec!["styles/styles.css".to_string()]
            }
        ))
    );
    Ok(())
}

#[test]
fn degraded_styles_signal_nothing() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("src/styles/base.scss", ".a { color: $missing; }");
    let ctx = mock_context(&fs);

    RenderStyles.run(&ctx)?;
    assert_eq!(ctx.reload.pending(0), None);
    Ok(())
}
