#![allow(clippy::unwrap_used)]
// Integration tests for `StatePoller` against a mocked panel.

use std::time::Duration;

use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wgpanel_api::{ApiClient, TransportConfig};
use wgpanel_core::{StatePoller, TrafficDisplayMode, TrafficSampler};

// ── Helpers ─────────────────────────────────────────────────────────

fn api_for(server: &MockServer) -> ApiClient {
    let url = Url::parse(&format!("{}/api", server.uri())).unwrap();
    ApiClient::new(url, &TransportConfig::default()).unwrap()
}

fn snapshot(client_id: &str, rx: u64) -> Value {
    json!({
        "state": {
            client_id: {
                "latestHandshake": "2024-05-01T11:59:30Z",
                "transferRx": rx,
                "transferTx": 0,
                "endpoint": "203.0.113.7:51820"
            }
        },
        "timestamp": "2024-05-01T12:00:00Z"
    })
}

fn state_path(interface_id: &str) -> String {
    format!("/api/interfaces/{interface_id}/clients-state")
}

/// Wait (in real time) until the sampler satisfies `ready`.
async fn wait_for(
    poller: &StatePoller,
    ready: impl FnMut(&TrafficSampler) -> bool,
) -> TrafficSampler {
    let mut rx = poller.subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(ready))
        .await
        .expect("sampler never reached the expected state")
        .unwrap()
        .clone()
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_failed_poll_clears_current_sample() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(state_path("if1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot("c1", 1024)))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(state_path("if1")))
        .respond_with(ResponseTemplate::new(500).set_body_string("wg show failed"))
        .mount(&server)
        .await;

    let mut poller = StatePoller::new(api_for(&server), TrafficDisplayMode::Rate);
    poller.watch("if1");

    let sampled = wait_for(&poller, |s| s.current().is_some()).await;
    assert_eq!(sampled.state("c1").and_then(|s| s.transfer_rx), Some(1024));

    let failed = wait_for(&poller, |s| s.consecutive_failures() >= 1).await;
    assert!(failed.current().is_none());
    assert_eq!(failed.consecutive_failures(), 1);
    assert!(poller.is_polling());
}

// ── Cadence ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_mode_change_restarts_at_new_cadence() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(state_path("if1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot("c1", 1)))
        .mount(&server)
        .await;

    let mut poller = StatePoller::new(api_for(&server), TrafficDisplayMode::Total);
    assert_eq!(poller.poll_period(), None);

    poller.watch("if1");
    assert_eq!(poller.poll_period(), Some(Duration::from_secs(5)));

    assert!(poller.set_mode(TrafficDisplayMode::Rate));
    assert_eq!(poller.poll_period(), Some(Duration::from_secs(1)));
    assert_eq!(poller.mode(), TrafficDisplayMode::Rate);

    assert!(!poller.set_mode(TrafficDisplayMode::Rate));
    assert_eq!(poller.poll_period(), Some(Duration::from_secs(1)));
}

#[tokio::test]
async fn test_mode_change_while_idle_does_not_start_polling() {
    let server = MockServer::start().await;
    let mut poller = StatePoller::new(api_for(&server), TrafficDisplayMode::Total);

    assert!(poller.set_mode(TrafficDisplayMode::Rate));
    assert!(!poller.is_polling());
    assert_eq!(poller.poll_period(), None);
}

// ── Interface switch ────────────────────────────────────────────────

#[tokio::test]
async fn test_late_answer_for_previous_interface_is_discarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(state_path("if1")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(snapshot("c1", 1))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(state_path("if2")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(snapshot("c2", 2))
                .set_delay(Duration::from_millis(900)),
        )
        .mount(&server)
        .await;

    let mut poller = StatePoller::new(api_for(&server), TrafficDisplayMode::Total);
    poller.watch("if1");
    tokio::time::sleep(Duration::from_millis(100)).await;
    poller.watch("if2");
    assert_eq!(poller.interface_id(), Some("if2"));

    let first = wait_for(&poller, |s| s.current().is_some()).await;
    assert!(first.state("c1").is_none());
    assert_eq!(first.state("c2").and_then(|s| s.transfer_rx), Some(2));
    assert!(first.previous().is_none());
}

// ── Stop ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_stop_halts_polling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(state_path("if1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot("c1", 1)))
        .mount(&server)
        .await;

    let mut poller = StatePoller::new(api_for(&server), TrafficDisplayMode::Rate);
    poller.watch("if1");
    wait_for(&poller, |s| s.current().is_some()).await;

    poller.stop();
    assert!(!poller.is_polling());
    assert_eq!(poller.interface_id(), None);
    let seen = server.received_requests().await.unwrap().len();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), seen);
    assert!(poller.sampler().current().is_some());
}
