use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use leadgate::config::LeadgateConfig;
use leadgate::http::{AppState, HttpServer};
use leadgate::leads::{mailer_from_config, notifiers_from_config, sheet_from_config, ConfirmationSender, LeadSheet};
use leadgate::ratelimit::{RateLimitGate, RateLimiter, SweeperHandle};

/// Rate-limited lead submission gateway.
#[derive(Parser, Debug)]
#[command(name = "leadgate", version, about)]
struct Args {
    /// Configuration file (YAML or TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the HTTP listen address
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);
    if args.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("Starting Leadgate");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = LeadgateConfig::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.server.http_addr = listen;
    }
    info!(
        http_addr = %config.server.http_addr,
        max_requests = config.rate_limiting.max_requests,
        window_ms = config.rate_limiting.window_ms,
        "Configuration loaded"
    );

    // Initialize the rate limiter and its expiry sweep
    let limiter = Arc::new(RateLimiter::new(config.rate_limiting.limits()));
    let sweeper = SweeperHandle::spawn(limiter.clone(), config.rate_limiting.sweep_interval());

    let gate = Arc::new(RateLimitGate::new(
        limiter,
        config.rate_limiting.client_identifier(),
        config.rate_limiting.message.clone(),
    ));

    let mailer = mailer_from_config(&config)?;
    let notifiers = notifiers_from_config(&config, mailer.as_ref())?;
    let sheet = sheet_from_config(&config)?;

    let state = Arc::new(AppState {
        gate,
        notifiers,
        mailer: mailer.map(|m| m as Arc<dyn ConfirmationSender>),
        sheet: sheet.map(|s| Arc::new(s) as Arc<dyn LeadSheet>),
        diagnostics_secret: config.diagnostics.secret.clone(),
    });

    let result = HttpServer::new(config.server.http_addr, state)
        .serve_with_shutdown(shutdown_signal())
        .await;

    sweeper.shutdown().await;
    result?;

    info!("Leadgate stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
