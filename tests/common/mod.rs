//! Common test utilities: scripted probes, a fake browser and recording sinks

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use sentinela::error::{Error, Result};
use sentinela::models::{
    CycleSnapshot, Endpoint, HeavySettings, HttpStatus, ProbeOutcome, ProbePolicy, ProbeTier,
};
use sentinela::output::ResultSink;
use sentinela::probe::classify::{classify_status, ErrorKind, Failure};
use sentinela::probe::{FastProbe, RenderDriver, RenderSession, SessionTimeouts};
use sentinela::utils::error::BrowserError;

// ============================================================================
// Endpoints
// ============================================================================

pub fn address_of(name: &str) -> String {
    format!("https://{name}.example.org")
}

/// Fast-only endpoint
pub fn endpoint(name: &str) -> Endpoint {
    Endpoint::new(name, address_of(name))
}

/// Endpoint that always skips the fast tier
pub fn forced_heavy(name: &str, max_attempts: u32) -> Endpoint {
    endpoint(name).with_policy(ProbePolicy {
        requires_heavy_probe: true,
        fallback_to_heavy: false,
        heavy: HeavySettings {
            timeout: Duration::from_secs(30),
            max_attempts,
        },
    })
}

/// Endpoint rendered when the fast tier gets no response
pub fn with_fallback(name: &str) -> Endpoint {
    endpoint(name).with_policy(ProbePolicy {
        requires_heavy_probe: false,
        fallback_to_heavy: true,
        heavy: HeavySettings::default(),
    })
}

// ============================================================================
// Fast tier
// ============================================================================

/// What the fake fast prober answers for one endpoint
#[derive(Debug, Clone)]
pub enum FastScript {
    Status(u16),
    NoResponse,
    Panic,
}

/// Scripted fast prober; unscripted endpoints answer 200
#[derive(Default)]
pub struct FakeFastProbe {
    scripts: HashMap<String, (FastScript, Duration)>,
    calls: Mutex<Vec<(String, Instant)>>,
    completions: Mutex<Vec<(String, Instant)>>,
}

impl FakeFastProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, name: &str, script: FastScript, delay: Duration) -> Self {
        self.scripts.insert(name.to_string(), (script, delay));
        self
    }

    /// Endpoint names in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    /// Endpoint names in completion order
    pub fn completions(&self) -> Vec<String> {
        self.completions
            .lock()
            .unwrap()
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// When the last scripted response was handed back
    pub fn last_completion(&self) -> Option<Instant> {
        self.completions.lock().unwrap().iter().map(|(_, t)| *t).max()
    }
}

#[async_trait]
impl FastProbe for FakeFastProbe {
    async fn probe(&self, endpoint: &Endpoint) -> ProbeOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.name.clone(), Instant::now()));

        let (script, delay) = self
            .scripts
            .get(&endpoint.name)
            .cloned()
            .unwrap_or((FastScript::Status(200), Duration::ZERO));

        tokio::time::sleep(delay).await;
        self.completions
            .lock()
            .unwrap()
            .push((endpoint.name.clone(), Instant::now()));

        match script {
            FastScript::Status(code) => match classify_status(code) {
                Some(failure) => ProbeOutcome::failure(ProbeTier::Fast, failure, delay),
                None => ProbeOutcome::success(ProbeTier::Fast, code, delay),
            },
            FastScript::NoResponse => ProbeOutcome::failure(
                ProbeTier::Fast,
                Failure::new(
                    ErrorKind::RequestError,
                    HttpStatus::Unknown,
                    "request error: connection refused",
                ),
                delay,
            ),
            FastScript::Panic => panic!("scripted probe crash for {}", endpoint.name),
        }
    }
}

// ============================================================================
// Heavy tier
// ============================================================================

/// What one navigation in the fake browser produces
#[derive(Debug, Clone)]
pub enum Render {
    Page { source: String, title: String },
    Fail(FakeFault),
    Hang,
}

#[derive(Debug, Clone)]
pub enum FakeFault {
    Timeout,
    Navigation(String),
}

impl Render {
    pub fn clean() -> Self {
        Self::page("<html><body>Bem-vindo</body></html>", "Portal")
    }

    pub fn page(source: &str, title: &str) -> Self {
        Self::Page {
            source: source.to_string(),
            title: title.to_string(),
        }
    }
}

#[derive(Default)]
struct DriverState {
    scripts: HashMap<String, Vec<Render>>,
    opened_by_url: HashMap<String, usize>,
}

/// In-memory browser counting concurrent sessions
#[derive(Clone, Default)]
pub struct FakeRenderDriver {
    state: Arc<Mutex<DriverState>>,
    start_failure: Arc<Mutex<Option<String>>>,
    start_hangs: Arc<Mutex<bool>>,
    navigate_delay: Arc<Mutex<Duration>>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
    max_live: Arc<AtomicUsize>,
    close_times: Arc<Mutex<Vec<Instant>>>,
}

impl FakeRenderDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successive navigations to `address` follow `renders`; the last one repeats
    pub fn script(self, address: &str, renders: Vec<Render>) -> Self {
        self.state
            .lock()
            .unwrap()
            .scripts
            .insert(address.to_string(), renders);
        self
    }

    /// Every session start fails with `message`
    pub fn failing_start(self, message: &str) -> Self {
        *self.start_failure.lock().unwrap() = Some(message.to_string());
        self
    }

    /// Session start never returns
    pub fn hanging_start(self) -> Self {
        *self.start_hangs.lock().unwrap() = true;
        self
    }

    pub fn with_navigate_delay(self, delay: Duration) -> Self {
        *self.navigate_delay.lock().unwrap() = delay;
        self
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    /// When the earliest session was closed, if any was
    pub fn first_close(&self) -> Option<Instant> {
        self.close_times.lock().unwrap().iter().min().copied()
    }

    pub fn navigations_to(&self, address: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .opened_by_url
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    fn next_render(&self, address: &str) -> Render {
        let mut state = self.state.lock().unwrap();
        let count = state.opened_by_url.entry(address.to_string()).or_insert(0);
        *count += 1;
        let index = *count - 1;

        match state.scripts.get(address) {
            Some(renders) if !renders.is_empty() => {
                renders[index.min(renders.len() - 1)].clone()
            }
            _ => Render::clean(),
        }
    }
}

#[async_trait]
impl RenderDriver for FakeRenderDriver {
    async fn open_session(
        &self,
        _timeouts: SessionTimeouts,
    ) -> std::result::Result<Box<dyn RenderSession>, BrowserError> {
        if let Some(message) = self.start_failure.lock().unwrap().clone() {
            return Err(BrowserError::SessionStart(message));
        }

        let hangs = *self.start_hangs.lock().unwrap();
        if hangs {
            std::future::pending::<()>().await;
        }

        self.opened.fetch_add(1, Ordering::SeqCst);
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);

        Ok(Box::new(FakeSession {
            driver: self.clone(),
            page: None,
            closed: false,
        }))
    }
}

struct FakeSession {
    driver: FakeRenderDriver,
    page: Option<(String, String)>,
    closed: bool,
}

#[async_trait]
impl RenderSession for FakeSession {
    async fn navigate(&mut self, url: &str) -> std::result::Result<(), BrowserError> {
        let delay = *self.driver.navigate_delay.lock().unwrap();
        tokio::time::sleep(delay).await;

        match self.driver.next_render(url) {
            Render::Page { source, title } => {
                self.page = Some((source, title));
                Ok(())
            }
            Render::Fail(FakeFault::Timeout) => Err(BrowserError::Timeout),
            Render::Fail(FakeFault::Navigation(message)) => {
                Err(BrowserError::Navigation(message))
            }
            Render::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }

    async fn page_source(&mut self) -> std::result::Result<String, BrowserError> {
        self.page
            .as_ref()
            .map(|(source, _)| source.clone())
            .ok_or(BrowserError::Closed)
    }

    async fn title(&mut self) -> std::result::Result<String, BrowserError> {
        self.page
            .as_ref()
            .map(|(_, title)| title.clone())
            .ok_or(BrowserError::Closed)
    }

    async fn close(&mut self) -> std::result::Result<(), BrowserError> {
        if !self.closed {
            self.closed = true;
            self.driver.closed.fetch_add(1, Ordering::SeqCst);
            self.driver.live.fetch_sub(1, Ordering::SeqCst);
            self.driver.close_times.lock().unwrap().push(Instant::now());
        }
        Ok(())
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Keeps every delivered snapshot with its handoff time
#[derive(Clone, Default)]
pub struct RecordingSink {
    delivered: Arc<Mutex<Vec<(CycleSnapshot, Instant)>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<CycleSnapshot> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|(s, _)| s.clone())
            .collect()
    }

    pub fn handoff_times(&self) -> Vec<Instant> {
        self.delivered.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

#[async_trait]
impl ResultSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn deliver(&self, snapshot: &CycleSnapshot) -> Result<()> {
        self.delivered
            .lock()
            .unwrap()
            .push((snapshot.clone(), Instant::now()));
        Ok(())
    }
}

/// Always fails
pub struct FailingSink;

#[async_trait]
impl ResultSink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    async fn deliver(&self, _snapshot: &CycleSnapshot) -> Result<()> {
        Err(Error::other("disk full"))
    }
}
