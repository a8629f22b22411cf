//! Sidepot Server Binary
//!
//! Runs the wager engine worker and the HTTP gateway in one process.

use clap::Parser;
use sidepot::config::{generate_sample_config, ConfigLoader};
use sidepot::directory::InMemoryDirectory;
use sidepot::engine::Engine;
use sidepot::gateway::GatewayServer;
use sidepot::ledger::InMemoryLedger;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sidepot")]
#[command(about = "Wager escrow and settlement server", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Gateway listen address (overrides configuration)
    #[arg(long)]
    host: Option<String>,

    /// Gateway port (overrides configuration)
    #[arg(long)]
    port: Option<u16>,

    /// Log filter, e.g. "sidepot=debug" (overrides RUST_LOG)
    #[arg(long)]
    log: Option<String>,

    /// Print a sample configuration file and exit
    #[arg(long)]
    sample_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.sample_config {
        print!("{}", generate_sample_config()?);
        return Ok(());
    }

    let filter = match &args.log {
        Some(directives) => tracing_subscriber::EnvFilter::try_new(directives)?,
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "sidepot=info,tower_http=info".into()),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let loader = match &args.config {
        Some(path) => ConfigLoader::new().with_path(path),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load()?;
    if let Some(host) = args.host {
        config.gateway.listen_address = host;
    }
    if let Some(port) = args.port {
        config.gateway.port = port;
    }

    info!("starting sidepot {}", env!("CARGO_PKG_VERSION"));

    let ledger = Arc::new(InMemoryLedger::new());
    let directory = Arc::new(InMemoryDirectory::new());
    let (engine, engine_task) =
        Engine::spawn(&config.engine, ledger.clone(), directory.clone());

    let gateway = GatewayServer::new(config.gateway, engine.clone(), directory, ledger);
    gateway.run().await?;

    // Gateway is down; drop the last handle so the worker drains out.
    drop(engine);
    engine_task.await?;

    info!("sidepot stopped");
    Ok(())
}
