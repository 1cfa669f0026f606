//! Campus Feed - development feed server
//!
//! Serves the realtime sensor channel, the snapshot endpoint and the built
//! web front end, and drives simulated sensor values.

mod api;
mod config;
mod error;
mod server;
mod simulator;
mod state;
mod ws;

use anyhow::{Context, Result};
use campus_core::Catalog;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "campus-feed")]
#[command(about = "Campus twin sensor feed and web server")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "campus-feed.toml")]
    config: PathBuf,

    /// Bind address for web server
    #[arg(short, long)]
    bind: Option<String>,

    /// Building catalog, overrides the configured path
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Serve the catalog values as-is without simulated drift
    #[arg(long)]
    no_simulation: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Campus Feed v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::load_config(&args.config)?;
    if let Some(bind) = args.bind {
        config.daemon.bind = bind;
    }
    if let Some(catalog) = args.catalog {
        config.feed.catalog = catalog.display().to_string();
    }
    if args.no_simulation {
        config.simulation.enabled = false;
    }

    let catalog = Catalog::load(Path::new(&config.feed.catalog))
        .with_context(|| format!("loading catalog {}", config.feed.catalog))?;

    info!(
        twin = %config.feed.twin_id,
        buildings = catalog.buildings().len(),
        "Configuration loaded"
    );

    let state = state::AppState::new(config.clone(), catalog);

    if config.simulation.enabled {
        let sim_state = state.clone();
        tokio::spawn(simulator::run(sim_state, config.simulation.clone()));
    }

    server::run(state, &config.daemon.bind).await
}
