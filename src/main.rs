//! Weighted round-robin HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                  LOAD BALANCER                    │
//!  Client Request      │  ┌────────┐   ┌────────────┐   ┌────────────┐    │
//!  ────────────────────┼─▶│  http  │──▶│  dispatch  │──▶│ scheduler  │    │
//!                      │  │ server │   │ retry/fail │   │ WRR + GCD  │    │
//!                      │  └────────┘   └─────┬──────┘   └─────┬──────┘    │
//!                      │                     │                │           │
//!                      │                     ▼                ▼           │
//!  Client Response     │               ┌───────────┐    ┌────────────┐    │
//!  ◀───────────────────┼───────────────│ forwarder │    │  registry  │◀─┐ │
//!                      │               └─────┬─────┘    └────────────┘  │ │
//!                      │                     │                          │ │
//!                      │                     ▼            ┌───────────┐ │ │
//!                      │                  Backend ◀───────│  health   │─┘ │
//!                      │                  nodes    probe  │  checker  │   │
//!                      │                                  └───────────┘   │
//!                      └──────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use wrr_balancer::config::{load_config, load_node_list, validate_config, BalancerConfig, ConfigError};
use wrr_balancer::observability::{logging, metrics};
use wrr_balancer::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "wrr-balancer")]
#[command(about = "Weighted round-robin HTTP load balancer", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Node list file, one `address[,weight]` per line. Replaces configured nodes.
    #[arg(short, long)]
    nodes: Option<PathBuf>,

    /// Port to listen on. Overrides the configured bind port.
    #[arg(short, long)]
    port: Option<u16>,
}

fn build_config(cli: &Cli) -> Result<BalancerConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) if cli.nodes.is_none() => load_config(path)?,
        Some(path) => toml::from_str(&std::fs::read_to_string(path)?)?,
        None => BalancerConfig::default(),
    };

    if let Some(path) = &cli.nodes {
        config.nodes = load_node_list(path)?;
    }
    if let Some(port) = cli.port {
        config.listener.bind_address = match config.listener.bind_address.parse::<SocketAddr>() {
            Ok(mut addr) => {
                addr.set_port(port);
                addr.to_string()
            }
            Err(_) => format!("0.0.0.0:{}", port),
        };
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = build_config(&cli)?;

    logging::init_logging(&config.observability);
    tracing::info!("wrr-balancer v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        nodes = config.nodes.len(),
        max_retries = config.retries.max_retries,
        max_attempts = config.retries.max_attempts,
        health_refresh_ms = config.health_check.refresh_rate_ms,
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

    let server = HttpServer::new(&config)?;
    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown.clone().trigger_on_ctrl_c());

    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
