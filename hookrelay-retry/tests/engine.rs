mod support;

use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use hookrelay_retry::{DeliveryEngine, RetryRecord};
use support::{event_record, event_value, MemoryStore};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use wiremock::matchers::{body_string, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// A target that resets the first `failures` connections, then answers
/// every later request with `body`.
async fn flaky_target(failures: usize, body: &'static str) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut seen = 0usize;
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            if seen < failures {
                seen += 1;
                drop(socket);
                continue;
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
        }
    });
    addr
}

#[tokio::test]
async fn first_try_success_leaves_the_store_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string(r#"{"x":1}"#))
        .respond_with(ResponseTemplate::new(200).set_body_string("success"))
        .expect(1)
        .mount(&server)
        .await;

    let store = MemoryStore::new();
    let engine = DeliveryEngine::new(store.clone());
    let msg = event_record("t", 0, 5, event_value(r#"{"x":1}"#, &server.uri(), ""));

    engine.fire(&msg, None, RetryRecord::default()).await.unwrap();
    assert!(store.is_untouched());
}

#[tokio::test]
async fn malformed_payload_is_dropped_silently() {
    let store = MemoryStore::new();
    let engine = DeliveryEngine::new(store.clone());
    let msg = event_record("t", 0, 5, b"definitely not json".to_vec());

    engine.fire(&msg, None, RetryRecord::default()).await.unwrap();
    assert!(store.is_untouched());
}

#[tokio::test]
async fn unparseable_url_is_dropped_silently() {
    let store = MemoryStore::new();
    let engine = DeliveryEngine::new(store.clone());
    let msg = event_record("t", 0, 5, event_value("{}", "hehe", ""));

    engine.fire(&msg, None, RetryRecord::default()).await.unwrap();
    assert!(store.is_untouched());
}

#[tokio::test]
async fn third_transport_attempt_success_skips_promotion() {
    let addr = flaky_target(2, r#"{"code":"0000","message":"","request_id":"r"}"#).await;

    let store = MemoryStore::new();
    let engine = DeliveryEngine::new(store.clone());
    let url = format!("http://{addr}/hook");
    let msg = event_record("t", 0, 5, event_value("{}", &url, ""));

    engine.fire(&msg, None, RetryRecord::default()).await.unwrap();
    assert!(store.is_untouched());
}

#[tokio::test(start_paused = true)]
async fn transport_exhaustion_promotes_into_the_first_tier() {
    let store = MemoryStore::new();
    let engine = DeliveryEngine::new(store.clone());
    // Port 1 is never listening, so all three attempts fail.
    let msg = event_record("t", 3, 42, event_value("{}", "http://127.0.0.1:1/hook", ""));

    let before = unix_now();
    engine.fire(&msg, None, RetryRecord::default()).await.unwrap();
    let after = unix_now();

    assert_eq!(store.list("t-list-attempts-2-4m"), vec!["42".to_owned()]);

    let hash = store.hash("t-hash-offset-42").unwrap();
    assert_eq!(hash["offset"], "42");
    assert_eq!(hash["partition"], "3");
    assert_eq!(hash["attempts"], "1");
    let next_time: i64 = hash["next_time"].parse().unwrap();
    assert!(next_time >= before + 240 && next_time <= after + 240);

    let expiry = store.expiry("t-hash-offset-42").unwrap();
    let week = 7 * 24 * 3600;
    assert!(expiry >= before + week && expiry <= after + week);
}

#[tokio::test(start_paused = true)]
async fn form_body_that_cannot_be_flattened_is_promoted() {
    let store = MemoryStore::new();
    let engine = DeliveryEngine::new(store.clone());
    let value = event_value(
        r#"{"nested":{"a":1}}"#,
        "http://127.0.0.1:1/hook",
        r#"{"Content-Type":"application/x-www-form-urlencoded"}"#,
    );
    let msg = event_record("t", 0, 7, value);

    engine.fire(&msg, None, RetryRecord::default()).await.unwrap();
    assert_eq!(store.list("t-list-attempts-2-4m"), vec!["7".to_owned()]);
}

#[tokio::test(start_paused = true)]
async fn replayed_failure_advances_to_the_next_tier() {
    let store = MemoryStore::new();
    let engine = DeliveryEngine::new(store.clone());
    let msg = event_record("t", 1, 9, event_value("{}", "http://127.0.0.1:1/hook", ""));
    let prior = RetryRecord {
        offset: 9,
        partition: 1,
        attempts: 1,
        next_time: unix_now() - 1,
    };

    let before = unix_now();
    engine
        .fire(&msg, Some("t-list-attempts-3-10m"), prior)
        .await
        .unwrap();

    assert_eq!(store.list("t-list-attempts-3-10m"), vec!["9".to_owned()]);
    let hash = store.hash("t-hash-offset-9").unwrap();
    assert_eq!(hash["attempts"], "2");
    let next_time: i64 = hash["next_time"].parse().unwrap();
    assert!(next_time >= before + 600);
}

#[tokio::test(start_paused = true)]
async fn capped_event_is_success_and_writes_nothing() {
    let store = MemoryStore::new();
    let engine = DeliveryEngine::new(store.clone());
    let msg = event_record("t", 0, 11, event_value("{}", "http://127.0.0.1:1/hook", ""));
    let prior = RetryRecord {
        offset: 11,
        partition: 0,
        attempts: 7,
        next_time: unix_now() - 1,
    };

    engine.fire(&msg, None, prior).await.unwrap();
    assert!(store.is_untouched());
}

#[tokio::test(start_paused = true)]
async fn store_failure_during_promotion_surfaces() {
    let store = MemoryStore::new();
    store.fail_writes();
    let engine = DeliveryEngine::new(store.clone());
    let msg = event_record("t", 0, 13, event_value("{}", "http://127.0.0.1:1/hook", ""));

    let err = engine
        .fire(&msg, None, RetryRecord::default())
        .await
        .unwrap_err();
    assert!(matches!(err, hookrelay_core::Error::Store(_)));
}
