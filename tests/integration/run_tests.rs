//! Full runs: collection, worker pool, aggregation and reports

use crate::create_test_config;
use serde_json::Value;
use std::fs;
use std::path::Path;
use sumi_linkcheck::checker::{run_linkcheck, Hyperlink};
use sumi_linkcheck::collector::{collect_documents, load_manifest};
use sumi_linkcheck::output::{JSON_REPORT, TEXT_REPORT};
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn read_json_lines(dir: &Path) -> Vec<Value> {
    fs::read_to_string(dir.join(JSON_REPORT))
        .expect("Failed to read JSON report")
        .lines()
        .map(|line| serde_json::from_str(line).expect("Invalid JSON line"))
        .collect()
}

#[tokio::test]
async fn test_full_run_over_document_tree() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("HEAD"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;
    Mock::given(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/moved"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/ok"))
        .mount(&mock_server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let source = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    fs::write(
        source.path().join("guide.html"),
        format!(
            "<a href=\"{base}/ok\">dup</a>\n<a href=\"{base}/busy\">busy</a>\n",
            base = base
        ),
    )
    .unwrap();
    fs::write(
        source.path().join("index.html"),
        format!(
            "<html><body>\n\
             <a href=\"{base}/ok\">ok</a>\n\
             <a href=\"{base}/gone\">gone</a>\n\
             <a href=\"{base}/moved\">moved</a>\n\
             <a href=\"install.html\">local</a>\n\
             <a href=\"missing.html\">missing</a>\n\
             <a href=\"mailto:docs@example.com\">mail</a>\n\
             <a href=\"https://skip.invalid/x\">skip</a>\n\
             </body></html>\n",
            base = base
        ),
    )
    .unwrap();
    fs::write(source.path().join("install.html"), "<p>Install</p>").unwrap();

    let mut config = create_test_config(source.path(), output.path());
    config.linkcheck.ignore = vec!["https://skip\\.invalid".to_string()];

    let links = collect_documents(source.path()).unwrap();
    assert_eq!(links.len(), 8);

    let outcome = run_linkcheck(&config, links).await.unwrap();
    assert!(outcome.broken);
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(outcome.stats.total, 8);
    assert_eq!(outcome.stats.count("working"), 2);
    assert_eq!(outcome.stats.count("broken"), 2);
    assert_eq!(outcome.stats.count("redirected"), 1);
    assert_eq!(outcome.stats.count("local"), 1);
    assert_eq!(outcome.stats.count("unchecked"), 1);
    assert_eq!(outcome.stats.count("ignored"), 1);

    let text = fs::read_to_string(output.path().join(TEXT_REPORT)).unwrap();
    let expected = format!(
        "index.html:3: [broken] {base}/gone: 404 Client Error: Not Found for url: {base}/gone\n\
         index.html:4: [redirected with Found] {base}/moved to {base}/ok\n\
         index.html:5: [local] install.html\n\
         index.html:6: [broken] missing.html: Local file not found\n",
        base = base
    );
    assert_eq!(text, expected);

    let records = read_json_lines(output.path());
    assert_eq!(records.len(), 8);
    assert_eq!(records[0]["filename"], "guide.html");
    assert_eq!(records[0]["lineno"], 1);
    assert_eq!(records[0]["status"], "working");
    assert_eq!(records[1]["uri"], format!("{}/busy", base));
    assert_eq!(records[1]["status"], "working");

    let redirect = records
        .iter()
        .find(|r| r["status"] == "redirected")
        .unwrap();
    assert_eq!(redirect["code"], 302);
    assert_eq!(redirect["text"], "with Found");
    assert_eq!(redirect["info"], format!("{}/ok", base));

    let ignored = records.iter().find(|r| r["status"] == "ignored").unwrap();
    assert_eq!(ignored["uri"], "https://skip.invalid/x");
    assert_eq!(ignored["lineno"], 8);
}

#[tokio::test]
async fn test_every_link_is_reported_once() {
    let mock_server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path_regex(r"^/page/\d+$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let source = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let mut config = create_test_config(source.path(), output.path());
    config.linkcheck.workers = 4;

    let links: Vec<Hyperlink> = (0..25)
        .map(|i| {
            Hyperlink::new(
                format!("{}/page/{}", mock_server.uri(), i),
                Some(format!("doc{:02}.html", i % 5)),
                Some(i as u32 + 1),
            )
        })
        .collect();

    let outcome = run_linkcheck(&config, links).await.unwrap();
    assert!(!outcome.broken);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(outcome.stats.total, 25);
    assert_eq!(outcome.stats.count("working"), 25);

    let records = read_json_lines(output.path());
    assert_eq!(records.len(), 25);

    // Sorted by document, then line
    let keys: Vec<(String, u64)> = records
        .iter()
        .map(|r| {
            (
                r["filename"].as_str().unwrap().to_string(),
                r["lineno"].as_u64().unwrap(),
            )
        })
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);

    assert_eq!(fs::read_to_string(output.path().join(TEXT_REPORT)).unwrap(), "");
}

#[tokio::test]
async fn test_run_from_manifest_with_only_ignored_links() {
    let source = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let manifest = source.path().join("links.jsonl");
    fs::write(
        &manifest,
        "{\"uri\": \"https://internal.invalid/a\", \"docname\": \"a.html\", \"lineno\": 1}\n\
         {\"uri\": \"https://internal.invalid/b\", \"docname\": \"b.html\", \"lineno\": 2}\n\
         {\"uri\": \"https://internal.invalid/a\", \"docname\": \"c.html\", \"lineno\": 3}\n",
    )
    .unwrap();

    let mut config = create_test_config(source.path(), output.path());
    config.linkcheck.ignore = vec!["https://internal\\.invalid/".to_string()];

    let links = load_manifest(&manifest).unwrap();
    let outcome = run_linkcheck(&config, links).await.unwrap();

    assert!(!outcome.broken);
    assert_eq!(outcome.stats.total, 2);
    assert_eq!(outcome.stats.count("ignored"), 2);

    let records = read_json_lines(output.path());
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["filename"], "a.html");
    assert_eq!(records[0]["info"], "");
    assert_eq!(records[1]["filename"], "b.html");
}

#[tokio::test]
async fn test_empty_run_writes_empty_reports() {
    let source = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let config = create_test_config(source.path(), &output.path().join("nested/out"));

    let outcome = run_linkcheck(&config, Vec::new()).await.unwrap();
    assert!(!outcome.broken);
    assert_eq!(outcome.stats.total, 0);

    let dir = output.path().join("nested/out");
    assert_eq!(fs::read_to_string(dir.join(TEXT_REPORT)).unwrap(), "");
    assert_eq!(fs::read_to_string(dir.join(JSON_REPORT)).unwrap(), "");
}

#[tokio::test]
async fn test_oversized_retry_after_does_not_stall_the_run() {
    let mock_server = MockServer::start().await;
    Mock::given(path("/flood"))
        .respond_with(
            ResponseTemplate::new(429).insert_header("Retry-After", "100000000000000000000"),
        )
        .mount(&mock_server)
        .await;

    let source = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let mut config = create_test_config(source.path(), output.path());
    // Below the 60s default backoff, so the first fallback gives up
    config.linkcheck.rate_limit_timeout = 30.0;

    let links = vec![Hyperlink::new(
        format!("{}/flood", mock_server.uri()),
        Some("index.html".to_string()),
        Some(3),
    )];

    let outcome = tokio::time::timeout(
        std::time::Duration::from_secs(10),
        run_linkcheck(&config, links),
    )
    .await
    .expect("run should finish")
    .unwrap();

    assert!(outcome.broken);
    assert_eq!(outcome.stats.count("broken"), 1);

    let records = read_json_lines(output.path());
    assert_eq!(records.len(), 1);
    assert!(records[0]["info"]
        .as_str()
        .unwrap()
        .starts_with("429 Client Error: Too Many Requests"));
}
