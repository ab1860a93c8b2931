//! Classifier behaviour against mock servers

use crate::create_test_config;
use std::time::Duration;
use sumi_linkcheck::checker::{CheckContext, Hyperlink};
use sumi_linkcheck::config::Config;
use sumi_linkcheck::state::{LinkStatus, WorkingInfo};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> (TempDir, Config) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(dir.path(), &dir.path().join("out"));
    (dir, config)
}

fn link(uri: String) -> Hyperlink {
    Hyperlink::new(uri, Some("index.html".to_string()), Some(1))
}

fn netloc(server: &MockServer) -> String {
    server.uri().trim_start_matches("http://").to_string()
}

#[tokio::test]
async fn test_repeat_uri_hits_network_once() {
    let mock_server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (_dir, config) = test_config();
    let ctx = CheckContext::new(&config).unwrap();
    let uri = format!("{}/page", mock_server.uri());

    assert_eq!(
        ctx.check(&link(uri.clone())).await,
        LinkStatus::Working(WorkingInfo::Fresh)
    );
    assert_eq!(
        ctx.check(&link(uri)).await,
        LinkStatus::Working(WorkingInfo::Cached)
    );
}

#[tokio::test]
async fn test_broken_replayed_from_cache() {
    let mock_server = MockServer::start().await;
    Mock::given(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let (_dir, config) = test_config();
    let ctx = CheckContext::new(&config).unwrap();
    let uri = format!("{}/gone", mock_server.uri());

    let first = ctx.check(&link(uri.clone())).await;
    let requests = mock_server.received_requests().await.unwrap().len();
    let second = ctx.check(&link(uri.clone())).await;

    assert_eq!(
        first,
        LinkStatus::broken(format!("404 Client Error: Not Found for url: {}", uri))
    );
    assert_eq!(second, first);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), requests);
}

#[tokio::test]
async fn test_retries_bounded() {
    let mock_server = MockServer::start().await;
    // Each attempt is a HEAD followed by a GET fallback
    Mock::given(method("HEAD"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let (_dir, mut config) = test_config();
    config.linkcheck.retries = 3;
    let ctx = CheckContext::new(&config).unwrap();

    let status = ctx.check(&link(format!("{}/flaky", mock_server.uri()))).await;
    assert!(status.is_broken());
    assert!(status.info().starts_with("500 Server Error: Internal Server Error"));
}

#[tokio::test]
async fn test_retries_stop_at_success() {
    let mock_server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/recovering"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/recovering"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(path("/recovering"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let (_dir, mut config) = test_config();
    config.linkcheck.retries = 5;
    let ctx = CheckContext::new(&config).unwrap();

    let status = ctx
        .check(&link(format!("{}/recovering", mock_server.uri())))
        .await;
    assert_eq!(status, LinkStatus::Working(WorkingInfo::Fresh));
    // First attempt: HEAD and GET fail. Second: HEAD fails, GET passes
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_anchor_found() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><body><h1>Title</h1><div id=\"sec1\">Section</div></body></html>",
        ))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (_dir, config) = test_config();
    let ctx = CheckContext::new(&config).unwrap();

    let status = ctx
        .check(&link(format!("{}/doc#sec1", mock_server.uri())))
        .await;
    assert_eq!(status, LinkStatus::Working(WorkingInfo::Fresh));
}

#[tokio::test]
async fn test_anchor_not_found() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><div id=\"other\"></div></body></html>"),
        )
        .mount(&mock_server)
        .await;

    let (_dir, config) = test_config();
    let ctx = CheckContext::new(&config).unwrap();

    let status = ctx
        .check(&link(format!("{}/doc#missing", mock_server.uri())))
        .await;
    assert_eq!(status, LinkStatus::broken("Anchor 'missing' not found"));
}

#[tokio::test]
async fn test_percent_encoded_anchor_decoded() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<section id=\"a b\"></section>"),
        )
        .mount(&mock_server)
        .await;

    let (_dir, config) = test_config();
    let ctx = CheckContext::new(&config).unwrap();

    let status = ctx
        .check(&link(format!("{}/doc#a%20b", mock_server.uri())))
        .await;
    assert_eq!(status, LinkStatus::Working(WorkingInfo::Fresh));
}

#[tokio::test]
async fn test_ignored_anchor_uses_head() {
    let mock_server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/app"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (_dir, config) = test_config();
    let ctx = CheckContext::new(&config).unwrap();

    // "^!" is in the default anchors-ignore list
    let status = ctx
        .check(&link(format!("{}/app#!/route", mock_server.uri())))
        .await;
    assert_eq!(status, LinkStatus::Working(WorkingInfo::Fresh));
}

#[tokio::test]
async fn test_permanent_redirect_reported() {
    let mock_server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/x"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/y"))
        .mount(&mock_server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/y"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let (_dir, config) = test_config();
    let ctx = CheckContext::new(&config).unwrap();

    let status = ctx.check(&link(format!("{}/x", mock_server.uri()))).await;
    assert_eq!(
        status,
        LinkStatus::Redirected {
            target: format!("{}/y", mock_server.uri()),
            code: 301,
        }
    );
}

#[tokio::test]
async fn test_redirect_keeps_unchecked_anchor() {
    let mock_server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(307).insert_header("Location", "/new"))
        .mount(&mock_server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let (_dir, mut config) = test_config();
    config.linkcheck.anchors = false;
    let ctx = CheckContext::new(&config).unwrap();

    let status = ctx
        .check(&link(format!("{}/old#usage", mock_server.uri())))
        .await;
    assert_eq!(
        status,
        LinkStatus::Redirected {
            target: format!("{}/new#usage", mock_server.uri()),
            code: 307,
        }
    );
}

#[tokio::test]
async fn test_trailing_slash_is_not_a_redirect() {
    let mock_server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/dir"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/dir/"))
        .mount(&mock_server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/dir/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let (_dir, config) = test_config();
    let ctx = CheckContext::new(&config).unwrap();

    let status = ctx.check(&link(format!("{}/dir", mock_server.uri()))).await;
    assert_eq!(status, LinkStatus::Working(WorkingInfo::Fresh));
}

#[tokio::test]
async fn test_unauthorized_counts_as_working() {
    let mock_server = MockServer::start().await;
    Mock::given(path("/private"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let (_dir, config) = test_config();
    let ctx = CheckContext::new(&config).unwrap();

    let status = ctx
        .check(&link(format!("{}/private", mock_server.uri())))
        .await;
    assert_eq!(status, LinkStatus::Working(WorkingInfo::Unauthorized));
    assert_eq!(status.info(), " - unauthorized");
}

#[tokio::test]
async fn test_service_unavailable_is_ignored() {
    let mock_server = MockServer::start().await;
    Mock::given(path("/maintenance"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let (_dir, config) = test_config();
    let ctx = CheckContext::new(&config).unwrap();

    let uri = format!("{}/maintenance", mock_server.uri());
    let status = ctx.check(&link(uri.clone())).await;
    assert_eq!(
        status,
        LinkStatus::ignored(format!(
            "503 Server Error: Service Unavailable for url: {}",
            uri
        ))
    );
}

#[tokio::test]
async fn test_head_rejected_falls_back_to_get() {
    let mock_server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/no-head"))
        .respond_with(ResponseTemplate::new(405))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/no-head"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (_dir, config) = test_config();
    let ctx = CheckContext::new(&config).unwrap();

    let status = ctx
        .check(&link(format!("{}/no-head", mock_server.uri())))
        .await;
    assert_eq!(status, LinkStatus::Working(WorkingInfo::Fresh));
}

#[tokio::test]
async fn test_unsupported_scheme_makes_no_request() {
    let mock_server = MockServer::start().await;

    let (_dir, config) = test_config();
    let ctx = CheckContext::new(&config).unwrap();

    let host = netloc(&mock_server);
    let status = ctx.check(&link(format!("ftp://{}/file", host))).await;
    assert_eq!(status, LinkStatus::Unchecked);
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rate_limited_then_recovers() {
    let mock_server = MockServer::start().await;
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
    // A throttled HEAD must not be retried as GET
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (_dir, config) = test_config();
    let ctx = CheckContext::new(&config).unwrap();
    let uri = format!("{}/busy", mock_server.uri());
    let host = netloc(&mock_server);

    let status = ctx.check(&link(uri.clone())).await;
    assert!(matches!(status, LinkStatus::RateLimited { .. }));
    assert_eq!(ctx.rate_limiter.get(&host).unwrap().delay, Duration::ZERO);
    // Transient outcomes are not memoized
    assert!(ctx.cache.lookup(&uri).is_none());

    let status = ctx.check(&link(uri)).await;
    assert_eq!(status, LinkStatus::Working(WorkingInfo::Fresh));
    assert!(ctx.rate_limiter.get(&host).is_none());
}

#[tokio::test]
async fn test_rate_limit_backoff_without_header() {
    let mock_server = MockServer::start().await;
    Mock::given(path("/throttled"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let (_dir, mut config) = test_config();
    config.linkcheck.rate_limit_timeout = 100.0;
    let ctx = CheckContext::new(&config).unwrap();
    let uri = format!("{}/throttled", mock_server.uri());
    let host = netloc(&mock_server);

    assert!(matches!(
        ctx.check(&link(uri.clone())).await,
        LinkStatus::RateLimited { .. }
    ));
    assert_eq!(ctx.rate_limiter.get(&host).unwrap().delay, Duration::from_secs(60));

    // 120s would cross the 100s ceiling for the first time: clamp
    assert!(matches!(
        ctx.check(&link(uri.clone())).await,
        LinkStatus::RateLimited { .. }
    ));
    assert_eq!(ctx.rate_limiter.get(&host).unwrap().delay, Duration::from_secs(100));

    // Already at the ceiling: give up
    let status = ctx.check(&link(uri.clone())).await;
    assert_eq!(
        status,
        LinkStatus::broken(format!("429 Client Error: Too Many Requests for url: {}", uri))
    );
}

#[tokio::test]
async fn test_configured_request_headers_sent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/api"))
        .and(header("x-token", "abc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (_dir, mut config) = test_config();
    config.linkcheck.request_headers.insert(
        mock_server.uri(),
        [("X-Token".to_string(), "abc".to_string())]
            .into_iter()
            .collect(),
    );
    let ctx = CheckContext::new(&config).unwrap();

    let status = ctx.check(&link(format!("{}/api", mock_server.uri()))).await;
    assert_eq!(status, LinkStatus::Working(WorkingInfo::Fresh));
}

#[tokio::test]
async fn test_connection_failure_is_broken() {
    let (_dir, config) = test_config();
    let ctx = CheckContext::new(&config).unwrap();

    // Nothing listens on the discard port
    let status = ctx.check(&link("http://127.0.0.1:9/".to_string())).await;
    assert!(status.is_broken());
    assert!(!status.info().is_empty());
}
