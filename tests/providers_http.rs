// tests/providers_http.rs
use dental_feed_monitor::ingest::providers::HttpFeedSource;
use dental_feed_monitor::{FeedSource, FetchError};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source() -> HttpFeedSource {
    HttpFeedSource::new("dental-feed-monitor-test/1.0", Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn fetches_and_parses_rss_with_user_agent() {
    let server = MockServer::start().await;
    let body = std::fs::read_to_string("tests/fixtures/dental_rss2.xml").unwrap();
    Mock::given(method("GET"))
        .and(path("/feed"))
        .and(header("user-agent", "dental-feed-monitor-test/1.0"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/rss+xml")
                .set_body_string(body),
        )
        .expect(1)
        .mount(&server)
        .await;

    let items = source()
        .fetch(&format!("{}/feed", server.uri()))
        .await
        .unwrap();
    assert_eq!(items.len(), 4);
    assert_eq!(items[0].title, "3Shape launches TRIOS 6 intraoral scanner");
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let url = format!("{}/gone", server.uri());
    match source().fetch(&url).await {
        Err(FetchError::Status { status, url: u }) => {
            assert_eq!(status, 410);
            assert_eq!(u, url);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn html_error_page_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>Maintenance</body></html>"))
        .mount(&server)
        .await;

    let res = source().fetch(&format!("{}/feed", server.uri())).await;
    assert!(matches!(res, Err(FetchError::Parse(_))));
}

#[tokio::test]
async fn connection_refused_is_http_error() {
    // Nothing listens on port 9 of localhost in CI containers.
    let res = source().fetch("http://127.0.0.1:9/feed").await;
    assert!(matches!(res, Err(FetchError::Http(_))));
}
