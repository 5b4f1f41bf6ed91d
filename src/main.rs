//! Ninja Arena Relay
//!
//! Relay server for Ninja Arena matches.
//! Keeps the player registry, forwards abilities and counts kills.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ninja_arena::{RelayConfig, RelayServer, VERSION};

/// Command line overrides; anything unset falls back to the environment.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// IP address to bind to
    #[clap(short = 'H', long)]
    host: Option<IpAddr>,
    /// Port to listen on
    #[clap(short, long)]
    port: Option<u16>,
    /// Kills needed to win a round
    #[clap(long)]
    victory_score: Option<u32>,
    /// Delay before scores reset after a victory (ms)
    #[clap(long)]
    reset_delay_ms: Option<u64>,
}

impl Args {
    fn apply(self, mut config: RelayConfig) -> RelayConfig {
        config.bind_addr = SocketAddr::new(
            self.host.unwrap_or_else(|| config.bind_addr.ip()),
            self.port.unwrap_or_else(|| config.bind_addr.port()),
        );
        if let Some(score) = self.victory_score {
            config.victory_score = score;
        }
        if let Some(ms) = self.reset_delay_ms {
            config.reset_delay = Duration::from_millis(ms);
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().apply(RelayConfig::from_env());

    info!("Ninja Arena Relay v{}", VERSION);
    info!("Victory at {} kills, reset after {:?}", config.victory_score, config.reset_delay);

    let bind_addr = config.bind_addr;
    let server = RelayServer::new(config);

    tokio::select! {
        result = server.run() => {
            result.with_context(|| format!("relay on {} failed", bind_addr))?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for ctrl-c")?;
            info!("Shutting down");
            server.shutdown();
        }
    }

    Ok(())
}
