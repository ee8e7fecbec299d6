//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for a MediaWiki `api.php` endpoint
//! and drive the full crawl cycle end-to-end.

use disamgraph::config::Config;
use disamgraph::output::write_outputs;
use disamgraph::storage::{RunStatus, SqliteStorage, Storage};
use disamgraph::{crawl, DisamError, FetchState, Title};
use serde_json::json;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn t(raw: &str) -> Title {
    Title::new(raw).unwrap()
}

/// Creates a test configuration pointing at the mock server
fn create_test_config(server: &MockServer, dir: &Path) -> Config {
    let mut config = Config::default();
    config.crawl.num_levels = 1;
    config.crawl.num_page_links = 2;
    config.crawl.max_concurrent_fetches = 4;
    config.source.api_url = format!("{}/w/api.php", server.uri());
    config.source.retry.initial_backoff_ms = 1;
    config.source.retry.max_backoff_ms = 5;
    config.source.min_request_delay_ms = 0;
    config.user_agent.crawler_name = "TestBot".to_string();
    config.output.graph_path = dir.join("graph.json").to_string_lossy().into_owned();
    config.output.cache_path = Some(dir.join("articles.db").to_string_lossy().into_owned());
    config
}

/// A parse response whose body links to `links` in order
fn parse_body(title: &str, links: &[&str]) -> serde_json::Value {
    let anchors: String = links
        .iter()
        .map(|link| format!(r#"<a href="/wiki/{}">{}</a> "#, link.replace(' ', "_"), link))
        .collect();
    json!({
        "parse": {
            "title": title,
            "text": format!(r#"<div class="mw-parser-output"><p>{}</p></div>"#, anchors),
        }
    })
}

fn missing_body() -> serde_json::Value {
    json!({
        "error": {
            "code": "missingtitle",
            "info": "The page you specified doesn't exist."
        }
    })
}

async fn mount_page(server: &MockServer, requested: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("page", requested))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mounts the "shot" scenario: senses A and B both link to X
async fn mount_shot(server: &MockServer) {
    mount_page(
        server,
        "Shot (disambiguation)",
        parse_body("Shot (disambiguation)", &["A", "B"]),
    )
    .await;
    mount_page(server, "A", parse_body("A", &["X", "Y"])).await;
    mount_page(server, "B", parse_body("B", &["X", "Z"])).await;
}

#[tokio::test]
async fn test_full_crawl_shot() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_shot(&server).await;

    let config = create_test_config(&server, dir.path());
    let report = crawl(&config, "Shot").await.unwrap();
    let graph = &report.graph;

    assert_eq!(report.senses, vec![t("A"), t("B")]);
    assert_eq!(graph.node_count(), 5);
    assert_eq!(graph.duplicates(), vec![t("X")]);
    assert_eq!(graph.node(&t("X")).unwrap().level, 1);
    assert!(graph.node(&t("A")).unwrap().fetched());
    assert!(report.status.is_complete());

    // Sense pages are fetched as lead sections only
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
    let lead_requests = requests
        .iter()
        .filter(|r| r.url.query_pairs().any(|(k, v)| k == "section" && v == "0"))
        .count();
    assert_eq!(lead_requests, 2);

    // The run is recorded in the article cache database
    let storage = SqliteStorage::new(Path::new(config.output.cache_path.as_ref().unwrap())).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.root_term, "Shot");
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.duplicate_count, Some(1));
    assert_eq!(storage.count_articles().unwrap(), 3);

    // The JSON description round-trips through the file system
    write_outputs(&report, &config.output).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&config.output.graph_path).unwrap())
            .unwrap();
    assert_eq!(json["graph"]["duplicates"], json!(["X"]));
    assert_eq!(json["status"]["complete"], true);
}

#[tokio::test]
async fn test_articles_written_by_sense() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_shot(&server).await;

    let mut config = create_test_config(&server, dir.path());
    let articles = dir.path().join("articles");
    config.output.articles_dir = Some(articles.to_string_lossy().into_owned());

    let report = crawl(&config, "Shot").await.unwrap();
    assert_eq!(report.articles.len(), 3);
    write_outputs(&report, &config.output).unwrap();

    let read = |path: &str| std::fs::read_to_string(articles.join(path)).unwrap();
    assert_eq!(read("Shot_(disambiguation).txt"), "A B");
    assert_eq!(read("A/A.txt"), "X Y");
    assert_eq!(read("B/B.txt"), "X Z");

    // X is only referenced at the level limit, so it has no text
    assert!(!articles.join("A").join("X.txt").exists());
}

#[tokio::test]
async fn test_second_run_served_from_cache() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_shot(&server).await;
    let config = create_test_config(&server, dir.path());

    crawl(&config, "Shot").await.unwrap();
    let report = crawl(&config, "Shot").await.unwrap();

    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    assert_eq!(report.status.fetches.store_hits, 3);
    assert_eq!(report.graph.duplicates(), vec![t("X")]);

    let mut refresh = config.clone();
    refresh.crawl.force_refresh = true;
    crawl(&refresh, "Shot").await.unwrap();
    assert_eq!(server.received_requests().await.unwrap().len(), 6);
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // Mounted first, so it answers the first request for B
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("page", "B"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_shot(&server).await;

    let config = create_test_config(&server, dir.path());
    let report = crawl(&config, "Shot").await.unwrap();

    assert!(report.graph.node(&t("B")).unwrap().fetched());
    assert!(report.status.failures.is_empty());
    assert_eq!(report.status.fetches.attempts, 4);
    assert_eq!(report.graph.duplicates(), vec![t("X")]);
}

#[tokio::test]
async fn test_rate_limit_honors_retry_after() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("page", "A"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_shot(&server).await;

    let config = create_test_config(&server, dir.path());
    let started = Instant::now();
    let report = crawl(&config, "Shot").await.unwrap();

    // The retry waits for the server's Retry-After, not the 1ms backoff
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(report.graph.node(&t("A")).unwrap().fetched());
    assert!(report.status.failures.is_empty());
    assert_eq!(report.status.fetches.attempts, 4);
}

#[tokio::test]
async fn test_requests_are_paced() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_shot(&server).await;

    let mut config = create_test_config(&server, dir.path());
    config.source.min_request_delay_ms = 200;
    let started = Instant::now();
    crawl(&config, "Shot").await.unwrap();

    // Three requests, at least 200ms apart
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    assert!(started.elapsed() >= Duration::from_millis(400));
}

#[tokio::test]
async fn test_missing_sense_is_pruned() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_page(
        &server,
        "Shot (disambiguation)",
        parse_body("Shot (disambiguation)", &["A", "Gone"]),
    )
    .await;
    mount_page(&server, "A", parse_body("A", &["X", "Y"])).await;
    mount_page(&server, "Gone", missing_body()).await;

    let config = create_test_config(&server, dir.path());
    let report = crawl(&config, "Shot").await.unwrap();

    assert_eq!(
        report.graph.node(&t("Gone")).unwrap().state,
        FetchState::NotFound
    );
    assert_eq!(report.status.failures.len(), 1);
    assert!(!report.status.degraded());
    assert!(report.graph.duplicates().is_empty());
}

#[tokio::test]
async fn test_api_redirect_collapses_titles() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_page(
        &server,
        "Hue (disambiguation)",
        parse_body("Hue (disambiguation)", &["A", "B"]),
    )
    .await;
    mount_page(&server, "A", parse_body("A", &["Colour"])).await;
    mount_page(&server, "B", parse_body("B", &["Color"])).await;
    mount_page(&server, "Colour", parse_body("Color", &["Light"])).await;
    mount_page(&server, "Color", parse_body("Color", &["Light"])).await;

    let mut config = create_test_config(&server, dir.path());
    config.crawl.num_levels = 2;
    let report = crawl(&config, "Hue").await.unwrap();
    let graph = &report.graph;

    assert!(graph.nodes().all(|node| node.title != t("Colour")));
    assert_eq!(graph.duplicates(), vec![t("Color")]);
    assert!(graph.node(&t("Color")).unwrap().fetched());
    assert_eq!(graph.canonical(&t("Colour")), t("Color"));
}

#[tokio::test]
async fn test_missing_disambiguation_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_page(&server, "Nothing (disambiguation)", missing_body()).await;

    let config = create_test_config(&server, dir.path());
    let report = crawl(&config, "Nothing").await.unwrap();

    assert!(report.graph.is_empty());
    assert_eq!(report.status.failures.len(), 1);
}

#[tokio::test]
async fn test_invalid_term_makes_no_requests() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    let result = crawl(&config, "   ").await;

    assert!(matches!(result, Err(DisamError::Config(_))));
    assert!(server.received_requests().await.unwrap().is_empty());
}
