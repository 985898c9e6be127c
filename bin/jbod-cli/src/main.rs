//! jbod-cli - byte-addressed access to a remote JBOD array
//!
//! Connects to a `jbod-server` (or the real service), mounts the array,
//! runs one command and unmounts again. The block cache hit rate is
//! printed to stderr when the command finishes.

mod trace;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use jbod_block::{BlockError, JbodVolume};
use jbod_common::{ClientConfig, MAX_IO_SIZE};
use jbod_proto::{BlockOperations, JbodClient};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::trace::{TraceOp, parse_trace};

#[derive(Parser, Debug)]
#[command(name = "jbod-cli")]
#[command(about = "Read and write a remote JBOD array")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "jbod.toml", global = true)]
    config: String,

    /// Server host (overrides the config file)
    #[arg(long, env = "JBOD_SERVER", global = true)]
    server: Option<String>,

    /// Server port (overrides the config file)
    #[arg(long, env = "JBOD_PORT", global = true)]
    port: Option<u16>,

    /// Cache entries, 0 disables the cache (overrides the config file)
    #[arg(long, global = true)]
    cache_entries: Option<usize>,

    /// Log level (overrides the config file)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read bytes and print them as hex
    Read {
        /// Linear start address
        #[arg(long)]
        addr: u32,
        /// Number of bytes (at most 1024)
        #[arg(long)]
        len: usize,
    },
    /// Write hex-encoded bytes
    Write {
        /// Linear start address
        #[arg(long)]
        addr: u32,
        /// Data as a hex string
        #[arg(long)]
        data: String,
    },
    /// Execute a trace file
    Replay {
        /// Trace file path
        file: String,
    },
}

type Volume = JbodVolume<JbodClient>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Parse the trace before touching the network
    let trace = match &cli.command {
        Commands::Replay { file } => {
            let text =
                std::fs::read_to_string(file).with_context(|| format!("reading {file}"))?;
            Some(parse_trace(&text)?)
        }
        _ => None,
    };

    let mut client = JbodClient::new();
    client
        .connect(&config.remote.address, config.remote.port)
        .await
        .context("connecting to the JBOD server")?;

    let mut volume = JbodVolume::new(client);
    if config.cache.enabled() {
        volume.create_cache(config.cache.entries)?;
    }

    let outcome = match cli.command {
        Commands::Read { addr, len } => read(&mut volume, addr, len).await,
        Commands::Write { addr, data } => write(&mut volume, addr, &data).await,
        Commands::Replay { .. } => replay(&mut volume, trace.as_deref().unwrap_or_default()).await,
    };

    if let Some(stats) = volume.cache_stats() {
        eprintln!("{stats}");
    }
    if volume.cache_enabled() {
        volume.destroy_cache()?;
    }
    volume.into_inner().disconnect().await;

    outcome
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config))?;

    if let Some(server) = &cli.server {
        config.remote.address.clone_from(server);
    }
    if let Some(port) = cli.port {
        config.remote.port = port;
    }
    if let Some(entries) = cli.cache_entries {
        config.cache.entries = entries;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level.clone_from(level);
    }

    config.validate()?;
    Ok(config)
}

async fn read(volume: &mut Volume, addr: u32, len: usize) -> Result<()> {
    if len > MAX_IO_SIZE {
        bail!("length {len} exceeds the {MAX_IO_SIZE}-byte limit");
    }
    let mut buf = vec![0u8; len];

    volume.mount().await?;
    let result = volume.read(addr, &mut buf).await;
    let unmounted = volume.unmount().await;

    result?;
    unmounted?;
    println!("{}", hex::encode(&buf));
    Ok(())
}

async fn write(volume: &mut Volume, addr: u32, data: &str) -> Result<()> {
    let bytes = hex::decode(data).context("--data must be a hex string")?;

    volume.mount().await?;
    let result = volume.write(addr, &bytes).await;
    let unmounted = volume.unmount().await;

    let written = result?;
    unmounted?;
    info!("Wrote {written} bytes at {addr}");
    Ok(())
}

/// Run every trace operation; fails afterwards if any of them failed
async fn replay<C: BlockOperations>(volume: &mut JbodVolume<C>, ops: &[TraceOp]) -> Result<()> {
    let mut failures = 0usize;

    for (index, op) in ops.iter().enumerate() {
        let result = match *op {
            TraceOp::Mount => volume.mount().await,
            TraceOp::Unmount => volume.unmount().await,
            TraceOp::Read { len, .. } | TraceOp::Write { len, .. } if len > MAX_IO_SIZE => {
                Err(BlockError::TooLarge {
                    length: len,
                    max: MAX_IO_SIZE,
                })
            }
            TraceOp::Read { addr, len } => {
                let mut buf = vec![0u8; len];
                volume.read(addr, &mut buf).await.map(|_| {
                    println!("{addr} {}", hex::encode(&buf));
                })
            }
            TraceOp::Write { addr, len, byte } => {
                volume.write(addr, &vec![byte; len]).await.map(|_| ())
            }
        };

        if let Err(e) = result {
            warn!("Trace op {} ({op:?}) failed: {e}", index + 1);
            failures += 1;
        }
    }

    info!("Replayed {} operations, {failures} failed", ops.len());
    if failures > 0 {
        bail!("{failures} of {} trace operations failed", ops.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jbod_proto::Command;
    use jbod_sim::DiskArray;

    #[tokio::test]
    async fn test_replay_trace() {
        let ops = parse_trace("MOUNT\nWRITE 300 600 171\nREAD 300 600\nUNMOUNT\n").unwrap();
        let mut volume = JbodVolume::with_cache(DiskArray::new(), 8).unwrap();

        replay(&mut volume, &ops).await.unwrap();
        assert!(!volume.is_mounted());
        let array = volume.into_inner();
        assert_eq!(array.block(0, 2), Some(&[171u8; 256]));
    }

    #[tokio::test]
    async fn test_replay_reports_failures() {
        let ops = [TraceOp::Unmount, TraceOp::Mount, TraceOp::Read { addr: 0, len: 8 }];
        let mut array = DiskArray::new();
        array.fail_next(Command::ReadBlock);
        let mut volume = JbodVolume::new(array);

        let err = replay(&mut volume, &ops).await.unwrap_err();
        assert_eq!(err.to_string(), "2 of 3 trace operations failed");
    }

    #[tokio::test]
    async fn test_replay_rejects_oversized_ops() {
        let ops = [
            TraceOp::Mount,
            TraceOp::Read {
                addr: 0,
                len: usize::MAX,
            },
            TraceOp::Write {
                addr: 0,
                len: usize::MAX,
                byte: 1,
            },
        ];
        let mut volume = JbodVolume::new(DiskArray::new());

        let err = replay(&mut volume, &ops).await.unwrap_err();
        assert_eq!(err.to_string(), "2 of 3 trace operations failed");
        assert_eq!(volume.ops().count(Command::ReadBlock), 0);
        assert_eq!(volume.ops().count(Command::WriteBlock), 0);
    }
}
