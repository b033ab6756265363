//! # Gambit Node Runtime
//!
//! Entry point: load configuration, install logging, play the configured
//! room and print the agreed log.
//!
//! ## Startup Sequence
//!
//! 1. Install the `tracing` subscriber (`RUST_LOG`, default `info`)
//! 2. Load configuration (file named by `GAMBIT_CONFIG`, then environment)
//! 3. Form the mesh and play every move
//! 4. Shut every room task down

use anyhow::{Context, Result};
use node_runtime::{NodeConfig, NodeRuntime};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")?;

    let config = NodeConfig::load().context("failed to load configuration")?;

    let mut runtime = NodeRuntime::new(config);
    let outcome = tokio::select! {
        result = async {
            runtime.start().await?;
            runtime.play().await
        } => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    match outcome {
        Some(Ok(log)) => {
            for (name, stats) in runtime.stats().await? {
                info!(
                    "{} at {} ({} ready, quorum {}, {:?})",
                    name, stats.head_index, stats.ready, stats.quorum, stats.sync
                );
            }
            for entry in &log {
                let event = entry
                    .data
                    .as_ref()
                    .map(|d| format!("{} {} {}", d.from, d.kind, d.payload))
                    .unwrap_or_else(|| "genesis".to_string());
                let short = entry.hash.get(..12).unwrap_or(&entry.hash);
                info!("{:>3} {} {}", entry.index, short, event);
            }
            runtime.shutdown().await;
            Ok(())
        }
        Some(Err(e)) => {
            runtime.shutdown().await;
            Err(e)
        }
        None => {
            info!("Interrupted");
            runtime.shutdown().await;
            Ok(())
        }
    }
}
