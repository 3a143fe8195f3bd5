// tests/notify_telegram.rs
use dental_feed_monitor::notify::telegram::MAX_MESSAGE_LEN;
use dental_feed_monitor::notify::{Notifier, TelegramNotifier};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn notifier(server: &MockServer) -> TelegramNotifier {
    TelegramNotifier::new("123:abc", "-100777")
        .with_api_base(server.uri())
        .with_backoff(Duration::from_millis(10))
}

#[tokio::test]
async fn posts_html_message_to_send_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .and(body_partial_json(serde_json::json!({
            "chat_id": "-100777",
            "text": "🦷 <b>Digital Dentistry Updates</b>",
            "parse_mode": "HTML",
            "disable_web_page_preview": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    notifier(&server)
        .send("🦷 <b>Digital Dentistry Updates</b>")
        .await
        .unwrap();
}

#[tokio::test]
async fn retries_on_server_error_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    notifier(&server).send("hello").await.unwrap();
}

#[tokio::test]
async fn gives_up_after_max_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .expect(2)
        .mount(&server)
        .await;

    let err = notifier(&server)
        .with_retries(2)
        .send("hello")
        .await
        .unwrap_err();
    let err = format!("{err:#}");
    assert!(err.contains("503"), "{err}");
    assert!(!err.contains("123:abc"), "token leaked: {err}");
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string(r#"{"ok":false,"description":"Bad Request: chat not found"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = notifier(&server).send("hello").await.unwrap_err();
    let err = format!("{err:#}");
    assert!(err.contains("400"), "{err}");
    assert!(err.contains("chat not found"), "{err}");
    assert!(!err.contains("123:abc"), "token leaked: {err}");
}

#[tokio::test]
async fn rate_limit_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    notifier(&server).send("hello").await.unwrap();
}

#[tokio::test]
async fn oversized_digest_is_sent_in_parts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut blocks = vec!["🦷 <b>Digital Dentistry Updates</b>".to_string()];
    for i in 0..13 {
        blocks.push(format!(
            "📰 Lab Weekly\n🔗 <a href='https://example.com/{i}'>Item {i}</a>\n📝 {}",
            "Zirconia milling results improved across the board. ".repeat(8)
        ));
    }
    let digest = blocks.join("\n\n");
    assert!(digest.encode_utf16().count() > MAX_MESSAGE_LEN);

    notifier(&server).send(&digest).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests.len() >= 2, "sent {} message(s)", requests.len());
    let texts: Vec<String> = requests
        .iter()
        .map(|r| {
            let v: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
            v["text"].as_str().unwrap().to_string()
        })
        .collect();
    for t in &texts {
        assert!(t.encode_utf16().count() <= MAX_MESSAGE_LEN);
    }
    assert!(texts[0].starts_with("🦷 <b>Digital Dentistry Updates</b>"));
    assert!(texts.last().unwrap().contains("Item 12"));
    // Every item arrives whole, in order.
    assert_eq!(texts.join("\n\n"), digest);
}

#[tokio::test]
async fn failing_part_stops_the_digest() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(400).set_body_string("message is too long"))
        .expect(1)
        .mount(&server)
        .await;

    let digest = ["x".repeat(3000), "y".repeat(3000)].join("\n\n");
    let err = notifier(&server).send(&digest).await.unwrap_err();
    assert!(format!("{err:#}").contains("part 1 of 2"), "{err:#}");
}

#[tokio::test]
async fn test_connection_sends_confirmation_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .and(body_partial_json(serde_json::json!({
            "text": "✅ Digital Dentistry Monitor: Configuration test successful!"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    notifier(&server).test_connection().await.unwrap();
}
