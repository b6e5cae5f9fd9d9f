//! Prometheus metrics for the sentinela monitor
//!
//! This module provides metrics tracking for:
//! - Probes: outcomes by tier/result/kind, latency by tier
//! - Cycles: duration, count, endpoints up/down, per-endpoint state
//! - Sinks: delivery failures
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_gauge_vec,
    register_histogram, register_histogram_vec, Counter, CounterVec, Encoder, Gauge, GaugeVec,
    Histogram, HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

use crate::models::{CycleSnapshot, ProbeOutcome};

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for per-probe metrics
struct ProbeMetrics {
    probes: CounterVec,
    probe_duration: HistogramVec,
}

/// Container for per-cycle metrics
struct CycleMetrics {
    cycles: Counter,
    cycle_duration: Histogram,
    endpoints_up: Gauge,
    endpoints_down: Gauge,
    endpoint_up: GaugeVec,
    sink_errors: CounterVec,
}

/// Global storage for probe metrics
static PROBE_METRICS: OnceLock<ProbeMetrics> = OnceLock::new();

/// Global storage for cycle metrics
static CYCLE_METRICS: OnceLock<CycleMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// This function should be called once at application startup.
/// If metric registration fails, errors are logged and subsequent
/// metric operations become no-ops.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = sentinela::metrics::init_metrics() {
///     eprintln!("Warning: Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let probe = ProbeMetrics {
        probes: register_counter_vec!(
            "sentinela_probes_total",
            "Total probe outcomes by tier, result and error kind",
            &["tier", "result", "kind"]
        )?,
        probe_duration: register_histogram_vec!(
            "sentinela_probe_duration_seconds",
            "Probe latency in seconds, including retries",
            &["tier"],
            vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
        )?,
    };

    let cycle = CycleMetrics {
        cycles: register_counter!("sentinela_cycles_total", "Total completed probe cycles")?,
        cycle_duration: register_histogram!(
            "sentinela_cycle_duration_seconds",
            "Wall time of one full probe cycle in seconds",
            vec![1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0, 300.0]
        )?,
        endpoints_up: register_gauge!(
            "sentinela_endpoints_up",
            "Endpoints reachable in the last cycle"
        )?,
        endpoints_down: register_gauge!(
            "sentinela_endpoints_down",
            "Endpoints unreachable in the last cycle"
        )?,
        endpoint_up: register_gauge_vec!(
            "sentinela_endpoint_up",
            "Whether the endpoint was reachable in the last cycle (1 = yes, 0 = no)",
            &["endpoint"]
        )?,
        sink_errors: register_counter_vec!(
            "sentinela_sink_errors_total",
            "Total result delivery failures by sink",
            &["sink"]
        )?,
    };

    PROBE_METRICS
        .set(probe)
        .map_err(|_| "Probe metrics already initialized")?;
    CYCLE_METRICS
        .set(cycle)
        .map_err(|_| "Cycle metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    PROBE_METRICS.get().is_some() && CYCLE_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record one probe outcome
pub fn record_probe(outcome: &ProbeOutcome) {
    let Some(m) = PROBE_METRICS.get() else {
        return;
    };

    let tier = outcome.tier.as_str();
    let result = if outcome.ok { "up" } else { "down" };
    let kind = outcome.error_kind.map(|k| k.as_str()).unwrap_or("none");

    m.probes.with_label_values(&[tier, result, kind]).inc();
    m.probe_duration
        .with_label_values(&[tier])
        .observe(outcome.latency.as_secs_f64());
}

/// Record a sealed cycle
pub fn record_cycle(snapshot: &CycleSnapshot) {
    let Some(m) = CYCLE_METRICS.get() else {
        return;
    };

    m.cycles.inc();
    m.cycle_duration.observe(snapshot.elapsed_ms as f64 / 1000.0);
    m.endpoints_up.set(snapshot.up_count() as f64);
    m.endpoints_down.set(snapshot.down_count() as f64);

    for result in &snapshot.results {
        m.endpoint_up
            .with_label_values(&[result.name.as_str()])
            .set(if result.ok { 1.0 } else { 0.0 });
    }
}

/// Record a failed sink delivery
pub fn record_sink_error(sink: &str) {
    if let Some(m) = CYCLE_METRICS.get() {
        m.sink_errors.with_label_values(&[sink]).inc();
    }
}

// ============================================================================
// Tests
// ============================================================================
