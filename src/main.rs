use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(
    name = "sentinela",
    version,
    about = "Dual-tier endpoint health monitor with a browser fallback",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, pretty, json); overrides the configuration file
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the inventory every interval and publish the results
    Run {
        /// Run a single cycle and exit
        #[arg(long, conflicts_with = "cycles")]
        once: bool,

        /// Stop after this many cycles
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        cycles: Option<u64>,
    },

    /// Validate the configuration and print the resolved inventory
    CheckConfig,

    /// Probe one address ad hoc
    Probe {
        /// Absolute http(s) URL
        url: String,

        /// Render the page in the browser instead of a plain request
        #[arg(long)]
        heavy: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.command {
        Commands::Probe { .. } => commands::load_config_or_default(&cli.config)?,
        _ => commands::load_config(&cli.config)?,
    };

    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    tracing::info!(config = %cli.config.display(), "sentinela starting");

    match cli.command {
        Commands::Run { once, cycles } => {
            let max_cycles = if once { Some(1) } else { cycles };
            tracing::info!(max_cycles = ?max_cycles, "Starting run command");
            commands::run(&config, max_cycles).await?;
        }

        Commands::CheckConfig => {
            commands::check_config(&config)?;
        }

        Commands::Probe { url, heavy } => {
            tracing::info!(url = %url, heavy = %heavy, "Starting probe command");
            commands::probe(&config, &url, heavy).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("sentinela=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("sentinela={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    Ok(())
}
