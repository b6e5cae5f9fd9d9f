//! HTML dashboard rendered with Handlebars
//!
//! One card per endpoint in inventory order, sized by its display tier and
//! colored by reachability. The page reloads itself so a browser left open
//! on it follows the monitor.

use async_trait::async_trait;
use handlebars::Handlebars;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{write_atomic, ResultSink};
use crate::config::OutputConfig;
use crate::error::Result;
use crate::models::{CycleSnapshot, EndpointResult};

/// Default dashboard template
const DEFAULT_TEMPLATE: &str = include_str!("../../templates/dashboard.hbs");

const TEMPLATE_NAME: &str = "dashboard";

/// Template data for one card
#[derive(Debug, Serialize)]
struct CardData {
    name: String,
    address: String,
    size_class: &'static str,
    status_class: &'static str,
    tooltip: String,
}

impl From<&EndpointResult> for CardData {
    fn from(result: &EndpointResult) -> Self {
        let tooltip = if result.ok {
            format!("{} - ONLINE ({}ms)", result.name, result.latency_ms)
        } else {
            format!("{} - OFFLINE: {}", result.name, result.error_detail)
        };

        Self {
            name: result.name.clone(),
            address: result.address.clone(),
            size_class: result.display.css_class(),
            status_class: if result.ok { "status-up" } else { "status-down" },
            tooltip,
        }
    }
}

/// Template data for the whole page
#[derive(Debug, Serialize)]
struct DashboardData<'a> {
    title: &'a str,
    lang: &'a str,
    refresh_secs: u64,
    generated_at: String,
    cycle: u64,
    elapsed_ms: u64,
    up: usize,
    down: usize,
    cards: Vec<CardData>,
}

/// Dashboard writer with Handlebars template engine
pub struct DashboardWriter {
    handlebars: Handlebars<'static>,
    path: PathBuf,
    title: String,
    lang: String,
    refresh_secs: u64,
}

impl DashboardWriter {
    /// Create a writer with the built-in template
    pub fn new(path: &Path, options: &OutputConfig) -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_template_string(TEMPLATE_NAME, DEFAULT_TEMPLATE)?;

        Ok(Self::with_engine(handlebars, path, options))
    }

    /// Create a writer with a custom template file
    pub fn with_template(path: &Path, template_path: &Path, options: &OutputConfig) -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.register_template_file(TEMPLATE_NAME, template_path)?;

        Ok(Self::with_engine(handlebars, path, options))
    }

    fn with_engine(handlebars: Handlebars<'static>, path: &Path, options: &OutputConfig) -> Self {
        Self {
            handlebars,
            path: path.to_path_buf(),
            title: options.title.clone(),
            lang: options.lang.clone(),
            refresh_secs: options.refresh_secs,
        }
    }

    /// Render a cycle to an HTML string
    pub fn render(&self, snapshot: &CycleSnapshot) -> Result<String> {
        let data = DashboardData {
            title: &self.title,
            lang: &self.lang,
            refresh_secs: self.refresh_secs,
            generated_at: snapshot.generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            cycle: snapshot.cycle,
            elapsed_ms: snapshot.elapsed_ms,
            up: snapshot.up_count(),
            down: snapshot.down_count(),
            cards: snapshot.results.iter().map(CardData::from).collect(),
        };

        Ok(self.handlebars.render(TEMPLATE_NAME, &data)?)
    }
}

#[async_trait]
impl ResultSink for DashboardWriter {
    fn name(&self) -> &str {
        "dashboard"
    }

    async fn deliver(&self, snapshot: &CycleSnapshot) -> Result<()> {
        let html = self.render(snapshot)?;
        write_atomic(&self.path, html.as_bytes()).await?;
        tracing::debug!(path = %self.path.display(), "Dashboard written");
        Ok(())
    }
}
