use clap::Parser;
use pronto_service::{load_config, router, AppState};
use pronto_telemetry::{ExportScheduler, Exporter, MetricStore, ResourceSampler, TelemetryConfig};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber;

#[derive(Parser)]
#[command(name = "pronto-service")]
#[command(about = "Pizza ordering service with push telemetry", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file (TOML or JSON); falls back to PRONTO_METRICS_* env vars
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address
    #[arg(short, long)]
    listen: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let (listen_addr, telemetry) = match &cli.config {
        Some(path) => {
            let config = load_config(path).await?;
            (config.listen_addr, config.telemetry)
        }
        None => ("0.0.0.0:8080".to_string(), TelemetryConfig::from_env()?),
    };
    let listen_addr = cli.listen.unwrap_or(listen_addr);

    let store = MetricStore::new();
    let scheduler = ExportScheduler::new(
        store.clone(),
        ResourceSampler::new(),
        Exporter::new(&telemetry),
        telemetry.export_period,
    );
    tokio::spawn(scheduler.run());

    let app = router(AppState::new(store));

    info!("Starting Pronto service on {}", listen_addr);
    info!("Endpoints:");
    info!("  GET    /health       - Health check");
    info!("  GET    /menu         - List the menu");
    info!("  POST   /orders       - Place an order");
    info!("  POST   /auth/login   - Log a diner in");
    info!("  DELETE /auth/logout  - Log a diner out");

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
