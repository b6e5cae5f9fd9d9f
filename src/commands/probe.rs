use anyhow::{Context, Result};
use std::sync::Arc;

use sentinela::config::Config;
use sentinela::models::{Endpoint, ProbeOutcome};
use sentinela::probe::{FastProbe, HeavyProber, HttpProber, WebDriverClient};

pub async fn probe(config: &Config, url: &str, heavy: bool) -> Result<()> {
    let endpoint = Endpoint::new(url, url);

    let outcome = if heavy {
        let driver = WebDriverClient::new(&config.browser)
            .context("Failed to create WebDriver client")?;
        let prober = HeavyProber::new(Arc::new(driver))
            .with_settle(config.monitor.settle())
            .with_retry_delay(config.monitor.heavy_retry_delay());
        prober
            .probe(&endpoint, config.monitor.heavy_defaults(), None)
            .await
    } else {
        let prober = HttpProber::new(config.monitor.fast_timeout())
            .context("Failed to create HTTP client")?;
        prober.probe(&endpoint).await
    };

    print_outcome(url, &outcome);
    Ok(())
}

fn print_outcome(url: &str, outcome: &ProbeOutcome) {
    println!("{url}");
    println!(
        "  {} via {} | status {} | {}ms | {} attempt(s)",
        if outcome.ok { "ONLINE" } else { "OFFLINE" },
        outcome.tier.as_str(),
        outcome.status,
        outcome.latency.as_millis(),
        outcome.attempts
    );
    if let Some(kind) = outcome.error_kind {
        println!("  {kind}: {}", outcome.error_detail);
    }
}
