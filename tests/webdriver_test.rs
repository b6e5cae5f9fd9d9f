//! Heavy tier against a mock chromedriver speaking the W3C wire protocol

mod common;

use common::endpoint;
use sentinela::config::BrowserConfig;
use sentinela::models::{HeavySettings, HttpStatus};
use sentinela::probe::{ErrorKind, HeavyProber, SettleDelay, WebDriverClient};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SESSION: &str = "/session/f00dcafe";

fn settings(max_attempts: u32) -> HeavySettings {
    HeavySettings {
        timeout: Duration::from_secs(30),
        max_attempts,
    }
}

fn prober_for(webdriver_url: String) -> HeavyProber {
    let config = BrowserConfig {
        webdriver_url,
        ..Default::default()
    };
    let driver = WebDriverClient::new(&config).unwrap();
    HeavyProber::new(Arc::new(driver)).with_settle(SettleDelay::none())
}

fn ok_value(value: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "value": value }))
}

fn wire_failure(error: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(500).set_body_json(json!({
        "value": { "error": error, "message": message, "stacktrace": "" }
    }))
}

async fn mount_session(server: &MockServer, expected_sessions: u64) {
    Mock::given(method("POST"))
        .and(path("/session"))
        .and(body_partial_json(json!({
            "capabilities": { "alwaysMatch": {
                "browserName": "chrome",
                "acceptInsecureCerts": true,
                "pageLoadStrategy": "eager"
            }}
        })))
        .respond_with(ok_value(json!({
            "sessionId": "f00dcafe",
            "capabilities": { "browserName": "chrome" }
        })))
        .expect(expected_sessions)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{SESSION}/timeouts")))
        .and(body_json(json!({ "pageLoad": 30000, "script": 30000 })))
        .respond_with(ok_value(json!(null)))
        .mount(server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(SESSION))
        .respond_with(ok_value(json!(null)))
        .expect(expected_sessions)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_render_through_webdriver() {
    let server = MockServer::start().await;
    mount_session(&server, 1).await;

    let target = endpoint("bi");

    Mock::given(method("POST"))
        .and(path(format!("{SESSION}/url")))
        .and(body_json(json!({ "url": target.address })))
        .respond_with(ok_value(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{SESSION}/source")))
        .respond_with(ok_value(json!("<html><body>Painel BI</body></html>")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{SESSION}/title")))
        .respond_with(ok_value(json!("SEMUS - BI")))
        .mount(&server)
        .await;

    let outcome = prober_for(server.uri()).probe(&target, settings(2), None).await;

    assert!(outcome.ok, "{outcome:?}");
    assert_eq!(outcome.status, HttpStatus::Code(200));
    assert_eq!(outcome.attempts, 1);
}

#[tokio::test]
async fn test_gateway_page_through_webdriver() {
    let server = MockServer::start().await;
    mount_session(&server, 1).await;

    Mock::given(method("POST"))
        .and(path(format!("{SESSION}/url")))
        .respond_with(ok_value(json!(null)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{SESSION}/source")))
        .respond_with(ok_value(json!("<html><center>nginx</center></html>")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{SESSION}/title")))
        .respond_with(ok_value(json!("504 Gateway Time-out")))
        .mount(&server)
        .await;

    let outcome = prober_for(server.uri())
        .probe(&endpoint("bi"), settings(2), None)
        .await;

    assert!(!outcome.ok);
    assert_eq!(outcome.error_kind, Some(ErrorKind::GatewayError));
    assert_eq!(outcome.status, HttpStatus::Code(504));
}

#[tokio::test]
async fn test_session_not_created_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(wire_failure(
            "session not created",
            "session not created: Chrome failed to start: exited abnormally.",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = prober_for(server.uri())
        .probe(&endpoint("bi"), settings(3), None)
        .await;

    assert!(!outcome.ok);
    assert_eq!(outcome.error_kind, Some(ErrorKind::Unclassified));
    assert!(
        outcome.error_detail.starts_with("browser unavailable"),
        "{}",
        outcome.error_detail
    );
    assert_eq!(outcome.attempts, 1);
}

#[tokio::test]
async fn test_unreachable_driver_is_fatal() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let outcome = prober_for(format!("http://127.0.0.1:{port}"))
        .probe(&endpoint("bi"), settings(3), None)
        .await;

    assert!(!outcome.ok);
    assert!(outcome.error_detail.contains("webdriver unreachable"));
    assert_eq!(outcome.attempts, 1);
}

#[tokio::test]
async fn test_navigation_error_is_retried_on_fresh_sessions() {
    let server = MockServer::start().await;
    mount_session(&server, 2).await;

    Mock::given(method("POST"))
        .and(path(format!("{SESSION}/url")))
        .respond_with(wire_failure(
            "unknown error",
            "unknown error: net::ERR_NAME_NOT_RESOLVED\n  (Session info: chrome=120.0.6099.109)",
        ))
        .expect(2)
        .mount(&server)
        .await;

    let outcome = prober_for(server.uri())
        .probe(&endpoint("conecta"), settings(2), None)
        .await;

    assert!(!outcome.ok);
    assert_eq!(outcome.error_kind, Some(ErrorKind::RenderNetworkError));
    assert_eq!(outcome.error_detail, "ERR_NAME_NOT_RESOLVED");
    assert_eq!(outcome.attempts, 2);
}

#[tokio::test]
async fn test_page_load_timeout() {
    let server = MockServer::start().await;
    mount_session(&server, 1).await;

    Mock::given(method("POST"))
        .and(path(format!("{SESSION}/url")))
        .respond_with(wire_failure(
            "timeout",
            "timeout: Timed out receiving message from renderer: 29.812",
        ))
        .mount(&server)
        .await;

    let outcome = prober_for(server.uri())
        .probe(&endpoint("bi"), settings(1), None)
        .await;

    assert!(!outcome.ok);
    assert_eq!(outcome.error_kind, Some(ErrorKind::RenderTimeout));
    assert_eq!(outcome.attempts, 1);
}

#[tokio::test]
async fn test_hung_session_start_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(
            ok_value(json!({ "sessionId": "f00dcafe" })).set_delay(Duration::from_secs(120)),
        )
        .mount(&server)
        .await;

    let settings = HeavySettings {
        timeout: Duration::from_secs(1),
        max_attempts: 1,
    };
    let outcome = tokio::time::timeout(
        Duration::from_secs(20),
        prober_for(server.uri()).probe(&endpoint("bi"), settings, None),
    )
    .await
    .expect("session start must be bounded by the attempt deadline");

    assert!(!outcome.ok);
    assert_eq!(outcome.error_kind, Some(ErrorKind::RenderTimeout));
    assert_eq!(outcome.attempts, 1);
}

#[tokio::test]
async fn test_stalled_command_hits_client_timeout() {
    let server = MockServer::start().await;
    mount_session(&server, 1).await;

    Mock::given(method("POST"))
        .and(path(format!("{SESSION}/url")))
        .respond_with(ok_value(json!(null)).set_delay(Duration::from_secs(120)))
        .mount(&server)
        .await;

    let config = BrowserConfig {
        webdriver_url: server.uri(),
        command_timeout_secs: 1,
        ..Default::default()
    };
    let driver = WebDriverClient::new(&config).unwrap();
    let prober = HeavyProber::new(Arc::new(driver)).with_settle(SettleDelay::none());

    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        prober.probe(&endpoint("bi"), settings(1), None),
    )
    .await
    .expect("stalled command must be cut off by the client timeout");

    assert!(!outcome.ok);
    assert_eq!(outcome.error_kind, Some(ErrorKind::RenderTimeout));
    assert_eq!(outcome.attempts, 1);
}
