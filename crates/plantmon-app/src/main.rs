//! plantmon entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use plantmon_app::{AppConfig, Application, DEFAULT_CONFIG_PATH};

/// Industrial hierarchy dashboard with a live MQTT overlay
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via PLANTMON_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Hierarchy JSON file, replacing the built-in catalog
    #[arg(long)]
    hierarchy: Option<String>,

    /// Broker host
    #[arg(long)]
    broker_host: Option<String>,

    /// Broker port
    #[arg(long)]
    broker_port: Option<u16>,

    /// Dashboard port
    #[arg(long)]
    dashboard_port: Option<u16>,

    /// Do not open the broker session at startup
    #[arg(long)]
    offline: bool,

    /// Validate configuration and hierarchy, print a summary and exit
    #[arg(long)]
    check: bool,
}

impl Args {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(path) = &self.hierarchy {
            config.hierarchy_path = Some(path.clone());
        }
        if let Some(host) = &self.broker_host {
            config.broker.host = host.clone();
        }
        if let Some(port) = self.broker_port {
            config.broker.port = port;
        }
        if let Some(port) = self.dashboard_port {
            config.dashboard.port = port;
        }
        if self.offline {
            config.connect_on_start = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config path: CLI arg > PLANTMON_CONFIG env var > default
    let config_path = args
        .config
        .clone()
        .or_else(|| std::env::var("PLANTMON_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let mut config = AppConfig::load(&config_path)?;
    args.apply(&mut config);
    config.validate()?;

    plantmon_telemetry::init_logging(&config.telemetry.log_level, config.telemetry.log_format)?;
    info!("Starting plantmon v{}", env!("CARGO_PKG_VERSION"));
    info!(config_path = %config_path, broker = %config.broker.url(), "Configuration loaded");

    let app = Application::new(config)?;

    if args.check {
        println!("{}", app.summary());
        return Ok(());
    }

    app.run().await?;
    Ok(())
}
