//! PetCare gateway binary.

use clap::Parser;
use petcare_gateway::{GatewayConfig, Profile};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// PetCare lookup gateway: veterinary drugs and disease alerts from public registries.
#[derive(Parser)]
#[command(name = "petcare-gateway", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides the config file).
    #[arg(long)]
    host: Option<String>,

    /// Listening port (overrides the config file and `PORT`).
    #[arg(short, long)]
    port: Option<u16>,

    /// Service profile: `drugs` or `alerts`.
    #[arg(long)]
    profile: Option<Profile>,

    /// Emit JSON log lines.
    #[arg(long)]
    json: bool,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("petcare_gateway=info,petcare_aggregate=info"));
    if cli.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let mut config = match cli.config {
        Some(ref path) => GatewayConfig::from_file(path)?,
        None => GatewayConfig::default(),
    };
    config.apply_env()?;
    if let Some(profile) = cli.profile {
        config.gateway.profile = profile;
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = Some(port);
    }

    if cli.print_config {
        if config.sources.is_empty() {
            config.sources = config.effective_sources();
        }
        config.validate()?;
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let server = petcare_gateway::start(&config).await?;
    info!(
        service = config.profile().service_name(),
        port = server.port(),
        "ready; press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    server.shutdown();
    Ok(())
}
