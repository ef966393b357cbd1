// tests/full_build.rs

mod common;
use crate::common::builders::{Project, ProjectBuilder};
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::sync::Arc;

use sitepipe::engine::{Composer, RunSequence};
use sitepipe::tasks::{names, TaskOutcome, TaskRegistry};

type TestResult = Result<(), Box<dyn Error>>;

const ICON: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="16" height="16"><path fill="#333" d="M0 0h16v16z"/></svg>"##;

fn sample_project() -> ProjectBuilder {
    ProjectBuilder::new()
        .source("parts/header/header.html", "<header>Site</header>")
        .source("parts/header/header.scss", ".header { display: flex; }")
        .source(
            "pages/index.html",
            "<html><body>\n<!-- inject:parts/header/header.html -->\n</body></html>",
        )
        .source("pages/index.js", "console.log('hi');")
        .source("pages/index.scss", ".index { user-select: none; }")
        .source("styles/_variables.scss", "$ink: #222;")
        .source("styles/base.scss", "body { color: $ink; }")
        .source("img/notes.txt", "plain copy")
        .source("img/svg-sprites/unchanged/logo.svg", ICON)
        .source("img/svg-sprites/colorized/bell.svg", ICON)
}

fn composer(project: &Project) -> Composer {
    Composer::new(Arc::new(TaskRegistry::with_defaults()), project.context())
}

#[tokio::test]
async fn default_build_produces_the_whole_site() -> TestResult {
    with_timeout(async {
        init_tracing();
        let project = sample_project().build();

        let report = composer(&project).run(&RunSequence::default_build()).await?;
        assert!(report.iter().all(|(_, o)| matches!(o, TaskOutcome::Success { .. })), "{report:?}");

        assert_eq!(
            project.output_files(),
            vec![
                "img/notes.txt",
                "pages/index.html",
                "pages/index.js",
                "sprite-unchanged.svg",
                "sprite.svg",
                "styles/styles.css",
                "styles/svg-sprite-unchanged.css",
                "styles/svg-sprite.css",
            ]
        );

        let page = project.read_output("pages/index.html").unwrap_or_default();
        assert!(page.contains("<header>Site</header>"), "{page}");
        assert!(!page.contains("inject:"), "{page}");

        let css = project.read_output("styles/styles.css").unwrap_or_default();
        assert!(css.contains("#222"), "{css}");
        assert!(css.contains(".header") && css.contains(".index"), "{css}");
        assert!(css.contains("-webkit-user-select"), "{css}");
        Ok(())
    })
    .await
}

#[tokio::test]
async fn rebuild_removes_stale_outputs() -> TestResult {
    with_timeout(async {
        let project = sample_project()
            .output("pages/deleted-page.html", "stale")
            .output("img/old.png", "stale")
            .build();

        composer(&project).run(&RunSequence::default_build()).await?;

        assert!(!project.output_exists("pages/deleted-page.html"));
        assert!(!project.output_exists("img/old.png"));
        assert!(project.output_exists("pages/index.html"));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn broken_styles_do_not_stop_the_build() -> TestResult {
    with_timeout(async {
        let project = sample_project()
            .source("styles/zz-broken.scss", ".oops { color: $nope; }")
            .build();

        let report = composer(&project).run(&RunSequence::default_build()).await?;

        let (name, outcome) = report.last().expect("tasks ran");
        assert_eq!(name, names::RENDER_STYLES);
        assert!(matches!(outcome, TaskOutcome::Degraded { .. }), "{outcome:?}");
        assert!(!project.output_exists("styles/styles.css"));
        // Everything before it still ran.
        assert!(project.output_exists("pages/index.html"));
        assert!(project.output_exists("sprite.svg"));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn single_task_run_leaves_other_outputs_alone() -> TestResult {
    with_timeout(async {
        let project = sample_project().output("keep.txt", "untouched").build();

        let report = composer(&project)
            .run(&RunSequence::single(names::RENDER_SCRIPTS))
            .await?;

        assert_eq!(report.len(), 1);
        assert_eq!(project.output_files(), vec!["keep.txt", "pages/index.js"]);
        Ok(())
    })
    .await
}
