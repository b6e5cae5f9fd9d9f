//! Minimal W3C WebDriver client
//!
//! Speaks just enough of the protocol to drive chromedriver for the heavy
//! tier: create a session with capabilities, set timeouts, navigate, read
//! the page source and title, and delete the session.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

use super::session::{RenderDriver, RenderSession, SessionTimeouts};
use crate::config::BrowserConfig;
use crate::utils::error::BrowserError;
use crate::utils::first_line;

/// WebDriver server connection
pub struct WebDriverClient {
    client: Client,
    base_url: String,
    capabilities: Value,
}

impl WebDriverClient {
    /// Create a client for the server in `config`
    ///
    /// No connection is made until the first session is opened. Every
    /// command is cut off after `command_timeout_secs`.
    pub fn new(config: &BrowserConfig) -> Result<Self, BrowserError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.command_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.webdriver_url.trim_end_matches('/').to_string(),
            capabilities: capabilities(config),
        })
    }

    async fn create_session(&self) -> Result<String, BrowserError> {
        let body = json!({ "capabilities": { "alwaysMatch": self.capabilities } });

        let response = self
            .client
            .post(format!("{}/session", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BrowserError::Timeout
                } else {
                    BrowserError::SessionStart(format!("webdriver unreachable: {e}"))
                }
            })?;

        let value = read_value(response).await.map_err(|e| match e {
            BrowserError::SessionStart(message) => BrowserError::SessionStart(message),
            BrowserError::Timeout => BrowserError::Timeout,
            other => BrowserError::SessionStart(other.to_string()),
        })?;

        value
            .get("sessionId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| BrowserError::SessionStart("response has no sessionId".to_string()))
    }
}

#[async_trait]
impl RenderDriver for WebDriverClient {
    async fn open_session(
        &self,
        timeouts: SessionTimeouts,
    ) -> Result<Box<dyn RenderSession>, BrowserError> {
        let session_id = self.create_session().await?;
        tracing::debug!(session_id = %session_id, "WebDriver session created");

        let mut session = WebDriverSession {
            client: self.client.clone(),
            url: format!("{}/session/{}", self.base_url, session_id),
            closed: false,
        };

        if let Err(e) = session.set_timeouts(timeouts).await {
            let _ = session.close().await;
            return Err(e);
        }

        Ok(Box::new(session))
    }
}

/// One live WebDriver session
struct WebDriverSession {
    client: Client,
    url: String,
    closed: bool,
}

impl WebDriverSession {
    async fn set_timeouts(&mut self, timeouts: SessionTimeouts) -> Result<(), BrowserError> {
        let body = json!({
            "pageLoad": timeouts.page_load.as_millis() as u64,
            "script": timeouts.script.as_millis() as u64,
        });

        let response = self
            .client
            .post(format!("{}/timeouts", self.url))
            .json(&body)
            .send()
            .await?;
        read_value(response).await?;
        Ok(())
    }

    async fn get_string(&self, command: &str) -> Result<String, BrowserError> {
        if self.closed {
            return Err(BrowserError::Closed);
        }

        let response = self
            .client
            .get(format!("{}/{command}", self.url))
            .send()
            .await?;
        let value = read_value(response).await?;

        match value {
            Value::String(text) => Ok(text),
            Value::Null => Ok(String::new()),
            other => Err(BrowserError::Protocol(format!(
                "expected string from /{command}, got {other}"
            ))),
        }
    }
}

#[async_trait]
impl RenderSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        if self.closed {
            return Err(BrowserError::Closed);
        }

        let response = self
            .client
            .post(format!("{}/url", self.url))
            .json(&json!({ "url": url }))
            .send()
            .await?;
        read_value(response).await?;
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String, BrowserError> {
        self.get_string("source").await
    }

    async fn title(&mut self) -> Result<String, BrowserError> {
        self.get_string("title").await
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let response = self.client.delete(&self.url).send().await?;
        match read_value(response).await {
            Ok(_) | Err(BrowserError::Closed) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Browser capabilities for a new session
pub fn capabilities(config: &BrowserConfig) -> Value {
    let mut args = Vec::new();
    if config.headless {
        args.push("--headless=new".to_string());
    }
    args.extend(
        [
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--disable-gpu",
            "--disable-blink-features=AutomationControlled",
            "--disable-infobars",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    if config.accept_insecure_certs {
        args.push("--ignore-certificate-errors".to_string());
        args.push("--allow-insecure-localhost".to_string());
    }
    if !config.language.is_empty() {
        args.push(format!("--lang={}", config.language));
    }
    if !config.window_size.is_empty() {
        args.push(format!("--window-size={}", config.window_size));
    }
    args.extend(config.extra_args.iter().cloned());

    json!({
        "browserName": config.browser_name,
        "acceptInsecureCerts": config.accept_insecure_certs,
        "pageLoadStrategy": "eager",
        "goog:chromeOptions": {
            "args": args,
            "excludeSwitches": ["enable-automation", "enable-logging"],
        },
    })
}

/// Unwrap the `value` member of a WebDriver response, mapping error payloads
async fn read_value(response: Response) -> Result<Value, BrowserError> {
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| BrowserError::Protocol(format!("invalid response body ({status}): {e}")))?;

    let value = match body {
        Value::Object(mut map) => map.remove("value").unwrap_or(Value::Null),
        _ => Value::Null,
    };

    if status.is_success() {
        Ok(value)
    } else {
        Err(wire_error(status, &value))
    }
}

/// Map a WebDriver error payload onto [`BrowserError`]
pub fn wire_error(status: StatusCode, value: &Value) -> BrowserError {
    let code = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .map(first_line)
        .unwrap_or_default()
        .to_string();

    match code {
        "timeout" | "script timeout" => BrowserError::Timeout,
        "session not created" => BrowserError::SessionStart(message),
        "invalid session id" => BrowserError::Closed,
        "unknown error" if message.contains("ERR_") || message.contains("NXDOMAIN") => {
            BrowserError::Navigation(message)
        }
        _ if message.is_empty() => BrowserError::Protocol(format!("{code} ({status})")),
        _ => BrowserError::Protocol(format!("{code}: {message}")),
    }
}
