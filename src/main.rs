use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use gator::cli::{Args, Command};
use gator::commands::{dispatch, AppContext};
use gator::config::Config;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Log lines would tear through the alternate screen
    let default_filter = if args.command == Command::Tui { "off" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config_path = match args.config {
        Some(path) => path,
        None => Config::default_path()?,
    };

    let shutdown = CancellationToken::new();
    tokio::spawn(forward_signals(shutdown.clone()));

    let mut ctx = AppContext::open(config_path).await?;
    let result = dispatch(&mut ctx, args.command, shutdown).await;
    ctx.close().await;
    result
}

/// Cancel `shutdown` on the first SIGINT or SIGTERM.
async fn forward_signals(shutdown: CancellationToken) {
    tokio::select! {
        _ = interrupt() => tracing::info!("Received SIGINT"),
        _ = terminate() => tracing::info!("Received SIGTERM"),
    }
    shutdown.cancel();
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for SIGINT");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
