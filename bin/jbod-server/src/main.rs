//! jbod-server - in-memory JBOD array over TCP
//!
//! Serves sixteen zeroed 64 KiB disks that live only as long as the
//! process. Useful for exercising `jbod-cli` without real hardware.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use jbod_common::ServerConfig;
use jbod_sim::{DiskArray, JbodServer};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "jbod-server")]
#[command(about = "In-memory JBOD disk array server")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "jbod-server.toml")]
    config: String,

    /// Listen address (overrides the config file)
    #[arg(short, long, env = "JBOD_LISTEN")]
    listen: Option<String>,

    /// Log level (overrides the config file)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config))?;
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting jbod-server");

    let listener = TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;

    let server = Arc::new(JbodServer::new(DiskArray::new()));

    tokio::select! {
        () = server.serve(listener) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}
