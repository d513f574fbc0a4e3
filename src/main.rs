//! WebDriver blocking proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                  BLOCKING PROXY                  │
//!                     │                                                  │
//!   WebDriver client  │  ┌─────────┐    ┌───────────┐    ┌───────────┐  │
//!   ──────────────────┼─▶│  http   │───▶│  routing  │───▶│  barrier  │  │
//!                     │  │ server  │    │ classify  │    │   chain   │  │
//!                     │  └────┬────┘    └───────────┘    └─────┬─────┘  │
//!                     │       │ /stabilize_proxy/*             │        │
//!                     │       ▼                                ▼        │
//!                     │  ┌─────────┐                    ┌───────────┐   │
//!                     │  │  admin  │                    │  forward  │───┼──▶ WebDriver
//!                     │  └─────────┘                    │  + relay  │◀──┼─── server
//!   ◀─────────────────┼───────────────────────────────────┴───────────┘   │
//!                     └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use blocking_proxy::config::validation::validate_config;
use blocking_proxy::config::{load_config, ConfigError, ProxyConfig};
use blocking_proxy::lifecycle::{build_server, Shutdown};
use blocking_proxy::observability::{logging, metrics};
use clap::Parser;
use tokio::net::TcpListener;

#[derive(Parser, Debug)]
#[command(name = "blocking-proxy")]
#[command(
    about = "WebDriver proxy that waits for page stability before forwarding commands",
    long_about = None
)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides listener.bind_address's port).
    #[arg(short, long)]
    port: Option<u16>,

    /// Address of the remote WebDriver server.
    #[arg(long = "selenium-address")]
    selenium_address: Option<String>,

    /// Directory to write WebDriver command logs to.
    #[arg(long = "log-dir")]
    log_dir: Option<String>,
}

impl Args {
    fn apply(&self, config: &mut ProxyConfig) {
        if let Some(port) = self.port {
            let host = config
                .listener
                .bind_address
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            config.listener.bind_address = format!("{}:{}", host, port);
        }
        if let Some(address) = &self.selenium_address {
            config.upstream.address = address.clone();
        }
        if let Some(dir) = &self.log_dir {
            config.observability.command_log_dir = Some(dir.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    args.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability);
    tracing::info!("blocking-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        stability_enabled = config.stability.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = build_server(&config)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
