//! Synced Canvas Server
//!
//! Run with: cargo run -- --config config.toml
//!
//! `RUST_LOG` takes precedence over the configured log level.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use synced_canvas::{generate_default_config, serve, AppState, Config, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "synced-canvas")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Real-time shared drawing canvas server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to a TOML config file (default: search standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory with the web client
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Don't send strokes back to the client that drew them
    #[arg(long)]
    no_echo: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a default config file to stdout
    PrintConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::PrintConfig) = &cli.command {
        print!("{}", generate_default_config());
        return Ok(());
    }

    let config_path = cli.config.clone().or_else(Config::discover);
    let mut config = match &config_path {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => Config::from_env(),
    };
    apply_cli_overrides(&mut config, &cli);

    init_tracing(&config.logging);

    tracing::info!("Starting synced canvas v{}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => tracing::info!("Loaded config from {:?}", path),
        None => tracing::info!("Using default config with environment overrides"),
    }
    tracing::info!("Echo to sender: {}", config.hub.echo_to_sender);

    let state = AppState::new(config.hub.clone());
    serve(state, &config.server).await?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(dir) = &cli.static_dir {
        config.server.static_dir = dir.clone();
    }
    if cli.no_echo {
        config.hub.echo_to_sender = false;
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "synced_canvas={},tower_http=info",
            logging.level
        ))
    });
    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
