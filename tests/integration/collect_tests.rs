//! Integration tests for the collectors
//!
//! These tests run the pagination driver against wiremock servers standing
//! in for the volumes API and the catalog site, with checkpoints in
//! temporary directories and a recording sleeper instead of real waits.

use biblio_harvest::collector::{
    build_http_client, ApiFetcher, ApiSource, CatalogSource, Driver, HtmlFetcher,
    PaginationPolicy, RecordingSleeper, StopReason,
};
use biblio_harvest::config::Config;
use biblio_harvest::record::{Field, Record, Value};
use biblio_harvest::storage::{read_table, CsvCheckpoint};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

const VOLUMES_PATH: &str = "/books/v1/volumes";
const SEARCH_PATH: &str = "/ebooks/search/";

type ApiDriver = Driver<ApiSource<RecordingSleeper>, CsvCheckpoint, RecordingSleeper>;
type CatalogDriver = Driver<CatalogSource<RecordingSleeper>, CsvCheckpoint, RecordingSleeper>;

/// Matches requests that carry no `key` query parameter
struct WithoutApiKey;

impl Match for WithoutApiKey {
    fn matches(&self, request: &Request) -> bool {
        !request.url.query_pairs().any(|(name, _)| name == "key")
    }
}

/// Creates a test configuration pointing both sources at the mock server
fn create_test_config(server: &MockServer, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.api.base_url = format!("{}{}", server.uri(), VOLUMES_PATH);
    config.api.output_path = path_string(dir, "api.csv");
    config.catalog.base_url = server.uri();
    config.catalog.output_path = path_string(dir, "catalog.csv");
    config
}

fn path_string(dir: &TempDir, name: &str) -> String {
    dir.path().join(name).display().to_string()
}

fn api_driver(config: &Config, api_key: Option<&str>, sleeper: &RecordingSleeper) -> ApiDriver {
    let client = build_http_client(&config.http, Duration::from_secs(5)).unwrap();
    let fetcher = ApiFetcher::new(
        client,
        Url::parse(&config.api.base_url).unwrap(),
        api_key.map(str::to_string),
        config.api.max_retries,
        Duration::from_secs(config.api.rate_limit_backoff_secs),
        sleeper.clone(),
    );

    Driver::new(
        ApiSource::new(fetcher),
        CsvCheckpoint::new(&config.api.output_path, "id"),
        PaginationPolicy::for_api(config),
        sleeper.clone(),
    )
}

fn catalog_driver(config: &Config, sleeper: &RecordingSleeper) -> CatalogDriver {
    let client = build_http_client(&config.http, Duration::from_secs(5)).unwrap();
    let fetcher = HtmlFetcher::new(
        client,
        config.catalog.max_retries,
        Duration::from_secs(1),
        sleeper.clone(),
    );
    let source = CatalogSource::new(
        fetcher,
        Url::parse(&config.catalog.base_url).unwrap(),
        &config.catalog.search_path,
        config.catalog.fetch_details,
    )
    .unwrap();

    Driver::new(
        source,
        CsvCheckpoint::new(&config.catalog.output_path, "title"),
        PaginationPolicy::for_catalog(config),
        sleeper.clone(),
    )
}

fn volumes_body(ids: &[&str]) -> serde_json::Value {
    if ids.is_empty() {
        return json!({"kind": "books#volumes", "totalItems": 0});
    }

    let items: Vec<_> = ids
        .iter()
        .map(|id| {
            json!({
                "kind": "books#volume",
                "id": id,
                "volumeInfo": {
                    "title": format!("Title {}", id),
                    "authors": ["First Author", "Second Author"],
                    "publishedDate": "2001-04-01",
                    "pageCount": 320,
                    "imageLinks": {"thumbnail": format!("http://books.example/{}.jpg", id)}
                }
            })
        })
        .collect();

    json!({"kind": "books#volumes", "totalItems": 1000, "items": items})
}

/// Mounts one page of volumes for `query` at `start_index`
async fn mount_volumes(server: &MockServer, query: &str, start_index: usize, ids: &[&str]) {
    Mock::given(method("GET"))
        .and(path(VOLUMES_PATH))
        .and(query_param("q", query))
        .and(query_param("startIndex", start_index.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(volumes_body(ids)))
        .mount(server)
        .await;
}

fn listing_body(entries: &[(&str, &str)]) -> String {
    let items: String = entries
        .iter()
        .map(|(title, href)| {
            format!(
                r#"<li class="booklink"><a class="link" href="{}">
                <span class="cell content">
                  <span class="title">{}</span>
                  <span class="subtitle">Some Author</span>
                </span></a></li>"#,
                href, title
            )
        })
        .collect();

    format!(
        r#"<html><body><ul class="results">{}</ul></body></html>"#,
        items
    )
}

/// Mounts one catalog search page for `category` at `start_index`
async fn mount_listing(
    server: &MockServer,
    category: &str,
    start_index: usize,
    entries: &[(&str, &str)],
) {
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("query", category))
        .and(query_param("start_index", start_index.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_body(entries))
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

fn worklist(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn ids(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.text(Field::Id))
        .map(str::to_string)
        .collect()
}

fn titles(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.text(Field::Title))
        .map(str::to_string)
        .collect()
}

async fn start_indices(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|r| {
            r.url
                .query_pairs()
                .find(|(name, _)| name == "startIndex")
                .map(|(_, value)| value.into_owned())
        })
        .collect()
}

async fn mount_two_queries(server: &MockServer) {
    mount_volumes(server, "fiction", 0, &["f1", "f2", "f3"]).await;
    mount_volumes(server, "fiction", 3, &[]).await;
    mount_volumes(server, "mystery", 0, &["m1", "m2", "m3", "m4", "m5"]).await;
    mount_volumes(server, "mystery", 5, &[]).await;
}

#[tokio::test]
async fn test_two_queries_collect_in_order() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_two_queries(&server).await;

    let config = create_test_config(&server, &dir);
    let sleeper = RecordingSleeper::new();
    let driver = api_driver(&config, None, &sleeper);

    let collection = driver.run(&worklist(&["fiction", "mystery"])).await;

    let expected = vec!["f1", "f2", "f3", "m1", "m2", "m3", "m4", "m5"];
    assert_eq!(ids(&collection.records), expected);

    let report = &collection.report;
    assert_eq!(report.items.len(), 2);
    assert_eq!(report.items[0].item, "fiction");
    assert_eq!(report.items[0].collected, 3);
    assert_eq!(report.items[0].total, 3);
    assert_eq!(report.items[1].item, "mystery");
    assert_eq!(report.items[1].collected, 5);
    assert_eq!(report.items[1].total, 8);
    assert_eq!(report.total_records, 8);

    // The checkpoint holds the same records in the same order
    let saved = read_table(&PathBuf::from(&config.api.output_path)).unwrap();
    assert_eq!(ids(&saved), expected);
    assert_eq!(
        saved[0].text(Field::Author),
        Some("First Author, Second Author")
    );
    assert_eq!(saved[0].field(Field::PageCount), Some(&Value::Integer(320)));
    assert_eq!(saved[0].text(Field::Source), Some("google_books_api"));

    // page, query, page
    assert_eq!(
        sleeper.durations(),
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(1)
        ]
    );
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_two_queries(&server).await;

    let config = create_test_config(&server, &dir);
    let items = worklist(&["fiction", "mystery"]);

    let first = api_driver(&config, None, &RecordingSleeper::new())
        .run(&items)
        .await;
    let second = api_driver(&config, None, &RecordingSleeper::new())
        .run(&items)
        .await;

    assert_eq!(second.report.prior_records, 8);
    assert_eq!(second.report.new_records(), 0);
    assert!(second.report.items.iter().all(|s| s.collected == 0));
    assert_eq!(ids(&second.records), ids(&first.records));

    let saved = read_table(&PathBuf::from(&config.api.output_path)).unwrap();
    assert_eq!(saved, first.records);
}

#[tokio::test]
async fn test_resumes_from_existing_checkpoint() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_volumes(&server, "fiction", 0, &["f1", "f2", "f3"]).await;
    mount_volumes(&server, "fiction", 3, &[]).await;

    let config = create_test_config(&server, &dir);
    std::fs::write(
        &config.api.output_path,
        "id,title,source\nf1,Title f1,google_books_api\nf2,Title f2,google_books_api\n",
    )
    .unwrap();

    let collection = api_driver(&config, None, &RecordingSleeper::new())
        .run(&worklist(&["fiction"]))
        .await;

    assert_eq!(collection.report.prior_records, 2);
    assert_eq!(collection.report.items[0].collected, 1);
    assert_eq!(ids(&collection.records), vec!["f1", "f2", "f3"]);
}

#[tokio::test]
async fn test_fresh_run_replaces_checkpoint() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_volumes(&server, "fiction", 0, &["f3"]).await;
    mount_volumes(&server, "fiction", 1, &[]).await;

    let config = create_test_config(&server, &dir);
    std::fs::write(&config.api.output_path, "id,title\nold,Old Title\n").unwrap();

    let collection = api_driver(&config, None, &RecordingSleeper::new())
        .with_resume(false)
        .run(&worklist(&["fiction"]))
        .await;

    assert_eq!(collection.report.prior_records, 0);
    let saved = read_table(&PathBuf::from(&config.api.output_path)).unwrap();
    assert_eq!(ids(&saved), vec!["f3"]);
}

#[tokio::test]
async fn test_cursor_advances_by_items_returned() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_volumes(&server, "short", 0, &["a", "b", "c", "d", "e", "f", "g"]).await;
    mount_volumes(&server, "short", 7, &[]).await;

    let config = create_test_config(&server, &dir);
    let collection = api_driver(&config, None, &RecordingSleeper::new())
        .run(&worklist(&["short"]))
        .await;

    assert_eq!(collection.records.len(), 7);
    assert_eq!(start_indices(&server).await, vec!["0", "7"]);

    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests
        .iter()
        .all(|r| r.url.query_pairs().any(|(k, v)| k == "maxResults" && v == "40")));
}

#[tokio::test]
async fn test_rate_limit_backoff_schedule() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(VOLUMES_PATH))
        .respond_with(ResponseTemplate::new(429))
        .expect(4)
        .mount(&server)
        .await;

    let config = create_test_config(&server, &dir);
    let sleeper = RecordingSleeper::new();
    let collection = api_driver(&config, None, &sleeper)
        .run(&worklist(&["fiction"]))
        .await;

    assert!(collection.records.is_empty());
    assert_eq!(collection.report.items[0].stop, StopReason::FetchFailed);
    assert_eq!(
        sleeper.durations(),
        vec![
            Duration::from_secs(60),
            Duration::from_secs(120),
            Duration::from_secs(240)
        ]
    );
}

#[tokio::test]
async fn test_rejected_key_retries_anonymously() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(VOLUMES_PATH))
        .and(query_param("key", "bad-key"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "Books API has not been used in project"}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(VOLUMES_PATH))
        .and(query_param("startIndex", "0"))
        .and(WithoutApiKey)
        .respond_with(ResponseTemplate::new(200).set_body_json(volumes_body(&["a", "b"])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(VOLUMES_PATH))
        .and(query_param("startIndex", "2"))
        .and(WithoutApiKey)
        .respond_with(ResponseTemplate::new(200).set_body_json(volumes_body(&[])))
        .mount(&server)
        .await;

    let config = create_test_config(&server, &dir);
    let collection = api_driver(&config, Some("bad-key"), &RecordingSleeper::new())
        .run(&worklist(&["fiction"]))
        .await;

    assert_eq!(ids(&collection.records), vec!["a", "b"]);
    assert_eq!(collection.report.items[0].stop, StopReason::Exhausted);
    // Two keyed attempts, each followed by one anonymous attempt
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 4);
}

#[tokio::test]
async fn test_forbidden_without_key_fails_query() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(VOLUMES_PATH))
        .and(query_param("q", "blocked"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;
    mount_volumes(&server, "fiction", 0, &["f1"]).await;
    mount_volumes(&server, "fiction", 1, &[]).await;

    let config = create_test_config(&server, &dir);
    let collection = api_driver(&config, None, &RecordingSleeper::new())
        .run(&worklist(&["blocked", "fiction"]))
        .await;

    assert_eq!(collection.report.items[0].stop, StopReason::FetchFailed);
    assert_eq!(collection.report.items[0].collected, 0);
    assert_eq!(ids(&collection.records), vec!["f1"]);
}

#[tokio::test]
async fn test_catalog_stale_pages_end_category() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let page = [("Leaves of Grass", "/ebooks/1322"), ("The Raven", "/ebooks/17192")];
    mount_listing(&server, "Poetry", 1, &page).await;
    mount_listing(&server, "Poetry", 3, &page).await;
    mount_listing(
        &server,
        "Poetry",
        5,
        &[("The  Raven", "/ebooks/17192"), ("Leaves of\nGrass", "/ebooks/1322")],
    )
    .await;
    mount_listing(&server, "Poetry", 7, &[("Paradise Lost", "/ebooks/26")]).await;

    let mut config = create_test_config(&server, &dir);
    config.catalog.max_stale_pages = Some(2);

    let collection = catalog_driver(&config, &RecordingSleeper::new())
        .run(&worklist(&["Poetry"]))
        .await;

    assert_eq!(
        titles(&collection.records),
        vec!["Leaves of Grass", "The Raven"]
    );
    let summary = &collection.report.items[0];
    assert_eq!(summary.stop, StopReason::StalePages);
    assert_eq!(summary.pages, 3);
    assert_eq!(
        collection.records[0].text(Field::DetailLink),
        Some(format!("{}/ebooks/1322", server.uri()).as_str())
    );
}

#[tokio::test]
async fn test_catalog_target_halts_run() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(
        &server,
        "Adventure",
        1,
        &[
            ("Treasure Island", "/ebooks/120"),
            ("Kidnapped", "/ebooks/421"),
            ("The Call of the Wild", "/ebooks/215"),
            ("Robinson Crusoe", "/ebooks/521"),
        ],
    )
    .await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("query", "Crime"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(&[])))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, &dir);
    config.catalog.target_total = Some(3);

    let sleeper = RecordingSleeper::new();
    let collection = catalog_driver(&config, &sleeper)
        .run(&worklist(&["Adventure", "Crime"]))
        .await;

    assert_eq!(
        titles(&collection.records),
        vec!["Treasure Island", "Kidnapped", "The Call of the Wild"]
    );
    assert_eq!(collection.report.items.len(), 1);
    assert_eq!(collection.report.items[0].stop, StopReason::TargetReached);
    assert!(sleeper.durations().is_empty());
}

#[tokio::test]
async fn test_catalog_page_retried_after_server_errors() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("start_index", "1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_listing(&server, "Music", 1, &[("Piano Sonatas", "/ebooks/900")]).await;
    mount_listing(&server, "Music", 2, &[]).await;

    let config = create_test_config(&server, &dir);
    let sleeper = RecordingSleeper::new();
    let collection = catalog_driver(&config, &sleeper)
        .run(&worklist(&["Music"]))
        .await;

    assert_eq!(titles(&collection.records), vec!["Piano Sonatas"]);
    assert_eq!(collection.report.items[0].stop, StopReason::Exhausted);
    // Two retry waits, then the delay after the first page
    assert_eq!(
        sleeper.durations(),
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_millis(300)
        ]
    );
}

#[tokio::test]
async fn test_catalog_detail_enrichment() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, "Novels", 1, &[("Emma", "/ebooks/158")]).await;
    mount_listing(&server, "Novels", 2, &[]).await;
    Mock::given(method("GET"))
        .and(path("/ebooks/158"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
            <table class="bibrec">
              <tr><th>Title</th><td>Emma (detail page)</td></tr>
              <tr><th>Language</th><td>English</td></tr>
              <tr><th>Release Date</th><td>Aug 1, 1994</td></tr>
            </table>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, &dir);
    config.catalog.fetch_details = true;

    let collection = catalog_driver(&config, &RecordingSleeper::new())
        .run(&worklist(&["Novels"]))
        .await;

    let record = &collection.records[0];
    assert_eq!(record.text(Field::Title), Some("Emma"));
    assert_eq!(record.text(Field::Language), Some("English"));
    assert_eq!(record.field(Field::Year), Some(&Value::Integer(1994)));
}
