//! AudioTrigger CLI Application

mod version;

use anyhow::Context;
use audiotrigger_core::domain::config::{ConfigManager, RelayConfig};
use audiotrigger_core::domain::dispatcher::Dispatcher;
use audiotrigger_infra::net::{DeliveryChannel, RelayEngine, SampleListener};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Inbound samples buffered between the listener and the engine
const SAMPLE_BUFFER: usize = 1024;

#[derive(Parser)]
#[command(name = "audiotrigger")]
#[command(about = "Relay microphone levels to CueStack as scene cues", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (defaults to the per-user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CueStack host
    #[arg(long)]
    sink_host: Option<String>,

    /// CueStack WebSocket port
    #[arg(long)]
    sink_port: Option<u16>,

    /// Address the sample listener binds to
    #[arg(long)]
    listen_host: Option<String>,

    /// Port the sample listener binds to
    #[arg(long)]
    listen_port: Option<u16>,

    /// Quiet time before a scene goes inactive, in milliseconds
    #[arg(long)]
    quiet_time_ms: Option<u64>,

    /// Evaluation period, in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq, Debug)]
enum Commands {
    /// Run the relay (default)
    Run,
    /// Print the effective configuration as TOML
    PrintConfig,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli).await?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::PrintConfig => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Commands::Run => run(config).await,
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "audiotrigger=debug,info"
    } else {
        "audiotrigger=info,warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

async fn load_config(cli: &Cli) -> anyhow::Result<RelayConfig> {
    let mut config = match &cli.config {
        Some(path) => RelayConfig::load_from_file(path)
            .await
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => match ConfigManager::default_config_dir() {
            Ok(dir) => ConfigManager::new(dir).load().await,
            Err(e) => {
                warn!(error = %e, "No config directory, using defaults");
                RelayConfig::default()
            }
        },
    };

    apply_overrides(&mut config, cli);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn apply_overrides(config: &mut RelayConfig, cli: &Cli) {
    if let Some(host) = &cli.sink_host {
        config.sink.host = host.clone();
    }
    if let Some(port) = cli.sink_port {
        config.sink.port = port;
    }
    if let Some(host) = &cli.listen_host {
        config.listener.host = host.clone();
    }
    if let Some(port) = cli.listen_port {
        config.listener.port = port;
    }
    if let Some(quiet_time_ms) = cli.quiet_time_ms {
        config.trigger.quiet_time_ms = quiet_time_ms;
    }
    if let Some(tick_ms) = cli.tick_ms {
        config.trigger.tick_period_ms = tick_ms;
    }
}

async fn run(config: RelayConfig) -> anyhow::Result<()> {
    let version = version::version_string(Path::new(".")).await;
    info!("🎙️ AudioTrigger {} is starting...", version);

    let (sample_tx, sample_rx) = mpsc::channel(SAMPLE_BUFFER);
    let listener = SampleListener::bind(&config.listener, sample_tx)
        .await
        .context("failed to start sample listener")?;

    let channel = Arc::new(DeliveryChannel::spawn(config.sink.clone()));
    let dispatcher = Dispatcher::new(config.trigger.clone(), channel.clone());

    RelayEngine::new(dispatcher, sample_rx)
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("Shutdown requested");
        })
        .await;

    listener.shutdown();
    channel.shutdown();
    info!("AudioTrigger stopped");
    Ok(())
}
