use anyhow::Result;

use sentinela::config::Config;
use sentinela::probe::Route;

pub fn check_config(config: &Config) -> Result<()> {
    let endpoints = config.resolve_endpoints();

    println!("Configuration OK");
    println!("================");
    println!(
        "  Interval: {}s | fast: {} workers, {}s timeout | heavy: {} workers",
        config.monitor.interval_secs,
        config.monitor.fast_workers,
        config.monitor.fast_timeout_secs,
        config.monitor.heavy_workers
    );
    println!("  WebDriver: {}", config.browser.webdriver_url);
    println!("\n{} endpoints:\n", endpoints.len());

    for (i, endpoint) in endpoints.iter().enumerate() {
        let route = match Route::for_endpoint(endpoint) {
            Route::Fast => "fast".to_string(),
            Route::FastThenHeavy(s) => format!(
                "fast -> heavy ({}s x{})",
                s.timeout.as_secs(),
                s.max_attempts
            ),
            Route::Heavy(s) => format!("heavy ({}s x{})", s.timeout.as_secs(), s.max_attempts),
        };

        println!(
            "{:>3}. {:<28} {:<10} {:<28} {}",
            i + 1,
            endpoint.name,
            format!("{:?}", endpoint.display).to_lowercase(),
            route,
            endpoint.address
        );
    }

    Ok(())
}
