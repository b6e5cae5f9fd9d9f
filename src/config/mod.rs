//! Configuration management for the sentinela monitor
//!
//! This module handles loading and validating the TOML configuration file,
//! applying environment overrides, and resolving the endpoint inventory into
//! immutable [`Endpoint`] values with their probing policies.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::{DisplayTier, Endpoint, HeavySettings, ProbePolicy};
use crate::probe::heavy::SettleDelay;
use crate::utils::extract_host;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cycle timing and pool sizes
    pub monitor: MonitorConfig,

    /// Static routing lists
    pub routing: RoutingConfig,

    /// Per-address policy overrides
    pub overrides: BTreeMap<String, EndpointOverride>,

    /// WebDriver connection and browser options
    pub browser: BrowserConfig,

    /// Where results are published
    pub output: OutputConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Ordered endpoint inventory
    pub endpoints: Vec<EndpointConfig>,
}

/// Cycle timing, tier timeouts and pool sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Sleep between the end of one cycle and the start of the next
    pub interval_secs: u64,

    /// Fast tier request timeout
    pub fast_timeout_secs: u64,

    /// Maximum concurrent fast probes
    pub fast_workers: usize,

    /// Maximum concurrent browser sessions
    pub heavy_workers: usize,

    /// Default heavy page-load timeout
    pub heavy_timeout_secs: u64,

    /// Default heavy attempt budget
    pub heavy_attempts: u32,

    /// Delay before a heavy retry (0 = immediately)
    pub heavy_retry_delay_ms: u64,

    /// Lower bound of the post-navigation settle delay
    pub settle_min_ms: u64,

    /// Upper bound of the post-navigation settle delay
    pub settle_max_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            fast_timeout_secs: 5,
            fast_workers: 10,
            heavy_workers: 2,
            heavy_timeout_secs: 30,
            heavy_attempts: 2,
            heavy_retry_delay_ms: 0,
            settle_min_ms: 500,
            settle_max_ms: 1000,
        }
    }
}

impl MonitorConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    #[must_use]
    pub fn fast_timeout(&self) -> Duration {
        Duration::from_secs(self.fast_timeout_secs)
    }

    #[must_use]
    pub fn heavy_retry_delay(&self) -> Duration {
        Duration::from_millis(self.heavy_retry_delay_ms)
    }

    /// Tier-wide heavy settings used when an endpoint has no override
    #[must_use]
    pub fn heavy_defaults(&self) -> HeavySettings {
        HeavySettings {
            timeout: Duration::from_secs(self.heavy_timeout_secs),
            max_attempts: self.heavy_attempts,
        }
    }

    #[must_use]
    pub fn settle(&self) -> SettleDelay {
        SettleDelay::new(
            Duration::from_millis(self.settle_min_ms),
            Duration::from_millis(self.settle_max_ms),
        )
    }
}

/// Static routing lists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Addresses that always skip the fast tier
    pub force_heavy: Vec<String>,
}

/// Policy override for one address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EndpointOverride {
    pub force_heavy: bool,
    pub fallback_to_heavy: bool,
    pub heavy_timeout_secs: Option<u64>,
    pub heavy_attempts: Option<u32>,
}

/// WebDriver connection and browser options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// WebDriver server (chromedriver) base URL
    pub webdriver_url: String,

    /// W3C `browserName` capability
    pub browser_name: String,

    pub headless: bool,

    pub accept_insecure_certs: bool,

    /// Value for `--lang`
    pub language: String,

    /// Value for `--window-size`
    pub window_size: String,

    /// Additional browser command-line arguments
    pub extra_args: Vec<String>,

    /// Upper bound on any single WebDriver HTTP command
    pub command_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: String::from("http://localhost:9515"),
            browser_name: String::from("chrome"),
            headless: true,
            accept_insecure_certs: true,
            language: String::from("pt-BR,pt,en-US,en"),
            window_size: String::from("1920,1080"),
            extra_args: Vec::new(),
            command_timeout_secs: 120,
        }
    }
}

/// Output sinks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// HTML dashboard file (disabled when unset)
    pub dashboard_path: Option<PathBuf>,

    /// JSON snapshot file (disabled when unset)
    pub snapshot_path: Option<PathBuf>,

    /// Prometheus textfile (disabled when unset)
    pub metrics_path: Option<PathBuf>,

    /// Custom Handlebars template replacing the built-in dashboard
    pub template_path: Option<PathBuf>,

    /// Dashboard page title
    pub title: String,

    /// Dashboard auto-refresh period
    pub refresh_secs: u64,

    /// `lang` attribute of the dashboard document
    pub lang: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dashboard_path: Some(PathBuf::from("output/dashboard.html")),
            snapshot_path: None,
            metrics_path: None,
            template_path: None,
            title: String::from("Painel de Monitoramento"),
            refresh_secs: 5,
            lang: String::from("pt-BR"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

/// One inventory entry as written in the file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub display: DisplayTier,
}

impl Config {
    /// Load, apply environment overrides, and validate
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Override selected values from `SENTINELA_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse::<u64>("SENTINELA_INTERVAL_SECS") {
            self.monitor.interval_secs = v;
        }

        if let Some(v) = env_parse::<usize>("SENTINELA_FAST_WORKERS") {
            self.monitor.fast_workers = v;
        }

        if let Some(v) = env_parse::<usize>("SENTINELA_HEAVY_WORKERS") {
            self.monitor.heavy_workers = v;
        }

        if let Ok(v) = std::env::var("SENTINELA_WEBDRIVER_URL") {
            self.browser.webdriver_url = v;
        }

        if let Ok(v) = std::env::var("SENTINELA_LOG_LEVEL") {
            self.logging.level = v;
        }

        if let Ok(v) = std::env::var("SENTINELA_LOG_FORMAT") {
            self.logging.format = v;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let monitor = &self.monitor;

        if monitor.fast_workers == 0 {
            anyhow::bail!("fast_workers must be greater than 0");
        }

        if monitor.heavy_workers == 0 {
            anyhow::bail!("heavy_workers must be greater than 0");
        }

        if monitor.fast_timeout_secs == 0 {
            anyhow::bail!("fast_timeout_secs must be greater than 0");
        }

        if monitor.heavy_timeout_secs == 0 {
            anyhow::bail!("heavy_timeout_secs must be greater than 0");
        }

        if monitor.heavy_attempts == 0 {
            anyhow::bail!("heavy_attempts must be at least 1");
        }

        if monitor.settle_min_ms > monitor.settle_max_ms {
            anyhow::bail!(
                "settle_min_ms ({}) must not exceed settle_max_ms ({})",
                monitor.settle_min_ms,
                monitor.settle_max_ms
            );
        }

        if !matches!(self.logging.format.as_str(), "text" | "pretty" | "json") {
            anyhow::bail!("unknown log format '{}'", self.logging.format);
        }

        if self.browser.command_timeout_secs == 0 {
            anyhow::bail!("browser.command_timeout_secs must be greater than 0");
        }

        validate_http_url(&self.browser.webdriver_url)
            .context("browser.webdriver_url is not a valid URL")?;

        let mut names = HashSet::new();
        let mut addresses = HashSet::new();
        for endpoint in &self.endpoints {
            if endpoint.name.trim().is_empty() {
                anyhow::bail!("endpoint with address '{}' has an empty name", endpoint.address);
            }

            if !names.insert(endpoint.name.as_str()) {
                anyhow::bail!("duplicate endpoint name '{}'", endpoint.name);
            }

            validate_http_url(&endpoint.address)
                .with_context(|| format!("endpoint '{}' has an invalid address", endpoint.name))?;

            addresses.insert(endpoint.address.as_str());
        }

        for address in &self.routing.force_heavy {
            if !addresses.contains(address.as_str()) {
                anyhow::bail!("routing.force_heavy lists unknown address '{address}'");
            }
        }

        for (address, entry) in &self.overrides {
            if !addresses.contains(address.as_str()) {
                anyhow::bail!("override for unknown address '{address}'");
            }

            if entry.heavy_timeout_secs == Some(0) {
                anyhow::bail!("override for '{address}': heavy_timeout_secs must be greater than 0");
            }

            if entry.heavy_attempts == Some(0) {
                anyhow::bail!("override for '{address}': heavy_attempts must be at least 1");
            }
        }

        Ok(())
    }

    /// Resolved probing policy for an address
    #[must_use]
    pub fn policy_for(&self, address: &str) -> ProbePolicy {
        let defaults = self.monitor.heavy_defaults();
        let entry = self.overrides.get(address);

        let forced = self.routing.force_heavy.iter().any(|a| a == address);

        match entry {
            Some(entry) => ProbePolicy {
                requires_heavy_probe: forced || entry.force_heavy,
                fallback_to_heavy: entry.fallback_to_heavy,
                heavy: HeavySettings {
                    timeout: entry
                        .heavy_timeout_secs
                        .map(Duration::from_secs)
                        .unwrap_or(defaults.timeout),
                    max_attempts: entry.heavy_attempts.unwrap_or(defaults.max_attempts),
                },
            },
            None => ProbePolicy {
                requires_heavy_probe: forced,
                fallback_to_heavy: false,
                heavy: defaults,
            },
        }
    }

    /// Inventory as immutable endpoints, in file order
    #[must_use]
    pub fn resolve_endpoints(&self) -> Vec<Endpoint> {
        self.endpoints
            .iter()
            .map(|entry| {
                Endpoint::new(entry.name.clone(), entry.address.clone())
                    .with_display(entry.display)
                    .with_policy(self.policy_for(&entry.address))
            })
            .collect()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

fn validate_http_url(address: &str) -> Result<()> {
    let scheme = address.split("://").next().unwrap_or_default();
    if !matches!(scheme.to_ascii_lowercase().as_str(), "http" | "https") {
        anyhow::bail!("'{address}' must be an absolute http(s) URL");
    }

    extract_host(address).with_context(|| format!("'{address}' has no host"))?;
    Ok(())
}
