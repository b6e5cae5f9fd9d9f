use anyhow::{Context, Result};

use sentinela::config::Config;
use sentinela::scheduler::CycleScheduler;

pub async fn run(config: &Config, max_cycles: Option<u64>) -> Result<()> {
    if let Err(e) = sentinela::metrics::init_metrics() {
        tracing::warn!(error = %e, "Metrics initialization failed, continuing without metrics");
    }

    let mut scheduler =
        CycleScheduler::from_config(config).context("Failed to set up the monitor")?;

    tracing::info!(
        endpoints = scheduler.endpoints().len(),
        interval_secs = config.monitor.interval_secs,
        webdriver = %config.browser.webdriver_url,
        "Monitor ready"
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let completed = scheduler.run_until(max_cycles, shutdown).await;
    tracing::info!(cycles = completed, "Monitor stopped");
    Ok(())
}
