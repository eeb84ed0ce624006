mod api;
mod error;
mod runner;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::runner::Runner;
use vigil_monitor::StateStore;

/// VIGIL System Monitor - monitor system resources and generate alerts
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Path to the violation state file
    #[arg(long, default_value = "/tmp/vigil-monitor-state.json")]
    state_file: String,

    /// Run one check and exit (cron friendly)
    #[arg(long)]
    cli: bool,

    /// Port for the HTTP server
    #[arg(short, long, default_value_t = 12349)]
    port: u16,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = vigil_config::load_config(&args.config).context("failed to load config")?;
    let store = StateStore::load(&args.state_file).context("failed to load violation state")?;
    let runner = Runner::new(config, store);

    if args.cli {
        run_cli(runner).await
    } else {
        run_server(runner, args.port).await
    }
}

/// CLI 模式：检查一次，打印状态，出错时非零退出
async fn run_cli(runner: Runner) -> Result<()> {
    let status = runner.check().await?;
    println!("{}", status.to_json());
    Ok(())
}

/// 服务器模式：每个入站请求触发一次评估周期
async fn run_server(runner: Runner, port: u16) -> Result<()> {
    let state = AppState {
        runner: Arc::new(runner),
    };

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Starting VIGIL System Monitor server on {}", addr);

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Received shutdown signal");
}
