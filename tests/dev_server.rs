// tests/dev_server.rs

mod common;
use crate::common::init_tracing;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sitepipe::fs::FileSystem;
use sitepipe::fs::mock::MockFileSystem;
use sitepipe::server::{Method, ReloadHandle, StaticSite};

fn site(fs: &MockFileSystem, listing: bool) -> StaticSite {
    let fs: Arc<dyn FileSystem> = Arc::new(fs.clone());
    StaticSite::new("dist", fs, listing, ReloadHandle::new())
}

fn sample_output() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file(
        "dist/pages/index.html",
        "<html><body><h1>Home</h1></body></html>",
    );
    fs.add_file("dist/styles/styles.css", "body{color:red}");
    fs.add_file("dist/img/logo.png", vec![0x89, b'P', b'N', b'G']);
    fs.add_file("dist/docs/a b.txt", "spaced");
    fs.add_file("dist/docs/<odd>.txt", "odd");
    fs.add_dir("dist/docs/sub");
    fs
}

fn body(reply: &sitepipe::server::Reply) -> String {
    String::from_utf8_lossy(&reply.body).into_owned()
}

#[test]
fn serves_files_with_content_types() {
    init_tracing();
    let site = site(&sample_output(), false);

    let css = site.handle(Method::Get, "/styles/styles.css", None);
    assert_eq!(css.status_code, 200);
    assert_eq!(css.content_type, "text/css; charset=utf-8");
    assert_eq!(body(&css), "body{color:red}");
    assert_eq!(css.header("cache-control"), Some("no-cache"));

    let png = site.handle(Method::Get, "/img/logo.png", None);
    assert_eq!(png.content_type, "image/png");
    assert_eq!(png.body, vec![0x89, b'P', b'N', b'G']);

    let spaced = site.handle(Method::Get, "/docs/a%20b.txt?cache=1", None);
    assert_eq!(body(&spaced), "spaced");
}

#[test]
fn html_gets_the_reload_client_before_body_end() {
    let site = site(&sample_output(), false);
    let page = site.handle(Method::Get, "/pages/index.html", None);
    let html = body(&page);
    let script = html.find("<script>").expect("client injected");
    assert!(html.contains("/__sitepipe/poll"), "{html}");
    assert!(script > html.find("<h1>").unwrap());
    assert!(html.ends_with("</body></html>"), "{html}");
}

#[test]
fn missing_and_escaping_paths_are_rejected() {
    let site = site(&sample_output(), false);
    assert_eq!(site.handle(Method::Get, "/nope.html", None).status_code, 404);
    assert_eq!(site.handle(Method::Get, "/../secret", None).status_code, 403);
    assert_eq!(site.handle(Method::Get, "/pages/%2E%2E/%2E%2E/x", None).status_code, 403);
    assert_eq!(site.handle(Method::Get, "/bad%zz", None).status_code, 400);
}

#[test]
fn directories_redirect_then_serve_index_or_listing() {
    let fs = sample_output();
    fs.add_file("dist/index.html", "<p>root</p>");

    let plain = site(&fs, false);
    let redirect = plain.handle(Method::Get, "/docs", None);
    assert_eq!(redirect.status_code, 301);
    assert_eq!(redirect.header("Location"), Some("/docs/"));

    let root = plain.handle(Method::Get, "/", None);
    assert_eq!(root.status_code, 200);
    assert!(body(&root).starts_with("<p>root</p>"));

    assert_eq!(plain.handle(Method::Get, "/docs/", None).status_code, 404);

    let listing = site(&fs, true).handle(Method::Get, "/docs/", None);
    assert_eq!(listing.status_code, 200);
    let html = body(&listing);
    assert!(html.contains("<a href=\"../\">"), "{html}");
    assert!(html.contains("<a href=\"sub/\">sub/</a>"), "{html}");
    assert!(html.contains("<a href=\"a%20b.txt\">a b.txt</a>"), "{html}");
    assert!(html.contains("&lt;odd&gt;.txt"), "{html}");
    assert!(html.find("sub/").unwrap() < html.find("a b.txt").unwrap());
}

#[test]
fn etag_allows_conditional_requests() {
    let site = site(&sample_output(), false);
    let first = site.handle(Method::Get, "/styles/styles.css", None);
    let etag = first.header("ETag").expect("etag").to_string();

    let again = site.handle(Method::Get, "/styles/styles.css", Some(&etag));
    assert_eq!(again.status_code, 304);
    assert!(again.body.is_empty());

    let stale = site.handle(Method::Get, "/styles/styles.css", Some("\"other\""));
    assert_eq!(stale.status_code, 200);
}

#[test]
fn head_has_headers_but_no_body() {
    let site = site(&sample_output(), false);
    let head = site.handle(Method::Head, "/styles/styles.css", None);
    assert_eq!(head.status_code, 200);
    assert!(head.body.is_empty());
    assert!(head.header("ETag").is_some());
}

#[test]
fn poll_times_out_with_none() {
    let site = site(&sample_output(), false);
    let reply = site.handle_poll("/__sitepipe/poll?since=0", Duration::from_millis(20));
    assert_eq!(reply.status_code, 200);
    assert_eq!(body(&reply), "0\nnone");
}

#[test]
fn poll_reports_injected_stylesheets() {
    let site = site(&sample_output(), false);
    let publisher = site.reload().clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        publisher.stream(["styles/styles.css"]);
    });

    let reply = site.handle_poll("/__sitepipe/poll?since=0", Duration::from_secs(5));
    handle.join().unwrap();
    assert_eq!(body(&reply), "1\ninject\nstyles/styles.css");

    site.reload().reload();
    let reply = site.handle_poll("/__sitepipe/poll?since=1", Duration::from_millis(20));
    assert_eq!(body(&reply), "2\nreload");
}
