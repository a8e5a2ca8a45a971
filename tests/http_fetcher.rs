use std::time::Duration;

use url::Url;
use vivi::core::link::TitleSource;
use vivi::links::title::FetchError;
use vivi::links::{HttpTitleFetcher, LinkRegistry, RecordOutcome, TitleFetcher, TitleResolver};
use vivi::store::{MemoryStore, RecordStore};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(timeout: Duration) -> HttpTitleFetcher {
    HttpTitleFetcher::new(timeout, "vivi-test").unwrap()
}

fn html(title: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(format!(
            "<!doctype html><html><head><title>{}</title></head><body></body></html>",
            title
        ))
}

#[tokio::test]
async fn reads_page_title() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(html("Weekly Sync &amp; Notes"))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/doc", server.uri())).unwrap();
    let title = fetcher(Duration::from_secs(5)).fetch_title(&url).await;
    assert_eq!(title.as_deref(), Some("Weekly Sync & Notes"));
}

#[tokio::test]
async fn error_status_is_no_title() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(
                    "<!doctype html><html><head><title>Not Found</title></head><body></body></html>",
                ),
        )
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
    let fetcher = fetcher(Duration::from_secs(5));
    assert!(matches!(
        fetcher.fetch_page(&url).await,
        Err(FetchError::Status(status)) if status.as_u16() == 404
    ));
    assert_eq!(fetcher.fetch_title(&url).await, None);
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html("Late").set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/slow", server.uri())).unwrap();
    let result = fetcher(Duration::from_millis(100)).fetch_page(&url).await;
    assert!(matches!(result, Err(FetchError::Timeout)));
}

#[tokio::test]
async fn registry_stores_fetched_title() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/plan"))
        .respond_with(html("Q3 Planning - Google Docs"))
        .expect(1)
        .mount(&server)
        .await;

    let timeout = Duration::from_secs(5);
    let registry = LinkRegistry::new(TitleResolver::new(fetcher(timeout), timeout));
    let mut store = MemoryStore::new();
    let url = format!("{}/plan", server.uri());

    let text = format!("Read {} before the review", url);
    let outcomes = registry.register_links(&mut store, &text, None).await.unwrap();
    assert_eq!(outcomes, [(url.clone(), RecordOutcome::Inserted)]);

    // Fetched titles are final: a repeat sighting does not hit the server again
    let outcome = registry.record(&mut store, &url, None).await.unwrap();
    assert_eq!(outcome, RecordOutcome::Existing);

    let link = &store.links_by_url(&url).unwrap()[0];
    assert_eq!(link.title, "Q3 Planning");
    assert_eq!(link.title_source, TitleSource::Fetched);
    assert_eq!(link.domain, "127.0.0.1");
}
