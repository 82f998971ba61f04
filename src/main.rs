//! Main entry point for the Elo Ladder service
//!
//! Loads configuration, initialises logging, applies the reset-on-boot
//! policy and serves the HTTP API until a shutdown signal arrives.

use anyhow::Result;
use clap::Parser;
use elo_ladder::config::{validate_config, AppConfig};
use elo_ladder::metrics::MetricsCollector;
use elo_ladder::rating::{EloRatingCalculator, InMemoryCompetitorStorage};
use elo_ladder::service::{serve, ApiState, LadderService};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Elo Ladder - Elo rating service for pairwise match results
#[derive(Parser)]
#[command(
    name = "elo-ladder",
    version,
    about = "An Elo rating ladder service for pairwise match results",
    long_about = "Elo Ladder keeps a rating for every registered competitor and updates \
                 both sides after each reported match using the Elo algorithm. Reporting \
                 a competitor as both winner and loser records a tie."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// HTTP host override
    #[arg(long, value_name = "HOST", help = "Override HTTP bind address")]
    host: Option<String>,

    /// HTTP port override
    #[arg(short, long, value_name = "PORT", help = "Override HTTP server port")]
    port: Option<u16>,

    /// K-factor override
    #[arg(short, long, value_name = "K", help = "Override the Elo K-factor")]
    k_factor: Option<f64>,

    /// Keep competitors from a previous run
    #[arg(long, help = "Do not reset the ladder on boot")]
    no_reset: bool,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("Elo Ladder");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   HTTP: {}", config.http_addr());
    info!("   K-factor: {}", config.rating.k_factor);
    info!("   Initial rating: {}", config.rating.initial_rating);
    info!("   Reset on boot: {}", config.storage.reset_on_boot);
}

/// Load and merge configuration from file/environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(config_path) => AppConfig::from_file(config_path)?,
        None => AppConfig::from_env()?,
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(host) = &args.host {
        config.service.http_host = host.clone();
    }

    if let Some(port) = args.port {
        config.service.http_port = port;
    }

    if let Some(k_factor) = args.k_factor {
        config.rating.k_factor = k_factor;
    }

    if args.no_reset {
        config.storage.reset_on_boot = false;
    }

    validate_config(&config)?;
    Ok(config)
}

/// Build the ladder service from configuration
fn build_ladder(config: &AppConfig) -> Result<Arc<LadderService>> {
    let calculator = EloRatingCalculator::new(config.elo_config())?;
    let storage = InMemoryCompetitorStorage::new(config.storage.max_competitors);
    let metrics = MetricsCollector::new()?;

    Ok(Arc::new(LadderService::new(
        Arc::new(calculator),
        Arc::new(storage),
        Arc::new(metrics),
    )))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {:#}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    display_startup_banner(&config);

    if args.dry_run {
        info!("Configuration validation successful");
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    let ladder = build_ladder(&config)?;

    // Reset-on-boot policy: every start begins with an empty ladder
    if config.storage.reset_on_boot {
        ladder.reset().await?;
    }

    let state = ApiState::new(ladder, config.service.name.clone());
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let mut server = tokio::spawn({
        let addr = config.http_addr();
        async move {
            serve(&addr, state, async move {
                let _ = shutdown_rx.await;
            })
            .await
        }
    });

    info!("Elo Ladder is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    tokio::select! {
        _ = wait_for_shutdown_signal() => {
            info!("Shutdown signal received, draining in-flight requests...");
            let _ = shutdown_tx.send(());
        }
        result = &mut server => {
            // The server only returns early on failure
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => {
                    error!("HTTP server failed: {:#}", e);
                    Err(e)
                }
                Err(e) => Err(e.into()),
            };
        }
    }

    match tokio::time::timeout(config.shutdown_timeout(), server).await {
        Ok(Ok(Ok(()))) => info!("Graceful shutdown completed successfully"),
        Ok(Ok(Err(e))) => error!("HTTP server error during shutdown: {:#}", e),
        Ok(Err(e)) => error!("HTTP server task failed: {}", e),
        Err(_) => warn!("Shutdown timeout exceeded, forcing exit"),
    }

    info!("Elo Ladder stopped");
    Ok(())
}
