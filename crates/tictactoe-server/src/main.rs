//! LAN tic-tac-toe server entry point.
//!
//! Referees exactly one match between two players, then exits.
//!
//! ```text
//! main()
//!  └─ load config, apply CLI overrides
//!  └─ bind Publisher (port_to_clients) and Collector (port_from_clients)
//!  └─ start services
//!       ├─ DiscoveryBroadcaster (UDP, every interval)
//!       └─ run_session          (arbitration loop, owns the Session)
//!  └─ on outcome / Ctrl-C / fault: cancel discovery, drain subscribers, exit
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                      | Flag                  |
//! |-------------------------------|-----------------------|
//! | `TICTACTOE_CONFIG`            | `--config`            |
//! | `TICTACTOE_DISCOVERY_PORT`    | `--discovery-port`    |
//! | `TICTACTOE_PORT_TO_CLIENTS`   | `--port-to-clients`   |
//! | `TICTACTOE_PORT_FROM_CLIENTS` | `--port-from-clients` |
//! | `TICTACTOE_ADVERTISE`         | `--advertise`         |
//! | `TICTACTOE_SEED`              | `--seed`              |
//!
//! `--write-config` saves the effective settings (file plus flags) to the
//! config path and exits without serving.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tictactoe_core::DiscoveryRecord;
use tictactoe_server::application::arbitrate::Session;
use tictactoe_server::application::run_session::{run_session, MessagePublisher};
use tictactoe_server::infrastructure::network::discovery::{local_ip, DiscoveryBroadcaster};
use tictactoe_server::infrastructure::network::pubsub::{Collector, Publisher};
use tictactoe_server::infrastructure::storage::config::{
    load_config, resolve_config_path, save_config, ServerConfig,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// LAN tic-tac-toe server.
///
/// Announces itself on the local network, waits for two players, and
/// referees one game.  Flags override values from the config file.
#[derive(Debug, Parser)]
#[command(name = "tictactoe-server", version)]
struct Cli {
    /// Path to a TOML config file (default: platform config directory).
    #[arg(long, env = "TICTACTOE_CONFIG")]
    config: Option<PathBuf>,

    /// UDP port discovery announcements are sent to.
    #[arg(long, env = "TICTACTOE_DISCOVERY_PORT")]
    discovery_port: Option<u16>,

    /// TCP port clients subscribe on.
    #[arg(long, env = "TICTACTOE_PORT_TO_CLIENTS")]
    port_to_clients: Option<u16>,

    /// TCP port clients publish to.
    #[arg(long, env = "TICTACTOE_PORT_FROM_CLIENTS")]
    port_from_clients: Option<u16>,

    /// Address to announce instead of the detected LAN address.
    #[arg(long, env = "TICTACTOE_ADVERTISE")]
    advertise: Option<String>,

    /// Seed for the first-mover shuffle, for reproducible matches.
    #[arg(long, env = "TICTACTOE_SEED")]
    seed: Option<u64>,

    /// Save the effective config to the config path and exit.
    #[arg(long)]
    write_config: bool,
}

impl Cli {
    fn apply(self, cfg: &mut ServerConfig) {
        if let Some(port) = self.discovery_port {
            cfg.network.discovery_port = port;
        }
        if let Some(port) = self.port_to_clients {
            cfg.network.port_to_clients = port;
        }
        if let Some(port) = self.port_from_clients {
            cfg.network.port_from_clients = port;
        }
        if let Some(addr) = self.advertise {
            cfg.network.advertised_address = Some(addr);
        }
        if let Some(seed) = self.seed {
            cfg.server.shuffle_seed = Some(seed);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone();
    let write_config = cli.write_config;
    let mut cfg = load_config(config_path.as_deref()).context("failed to load server config")?;
    cli.apply(&mut cfg);

    if write_config {
        let path = resolve_config_path(config_path.as_deref())?;
        save_config(&cfg, &path).context("failed to save server config")?;
        println!("Config written to {}", path.display());
        return Ok(());
    }

    // Initialise structured logging.  `RUST_LOG` wins over the config file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.server.log_level)),
        )
        .init();

    info!("tic-tac-toe server starting");

    // ── Transport ─────────────────────────────────────────────────────────────
    let publisher = Publisher::bind(cfg.network.publisher_addr()?)
        .await
        .context("failed to start publisher")?;
    let mut collector = Collector::bind(cfg.network.collector_addr()?)
        .await
        .context("failed to start collector")?;

    // ── Discovery broadcaster ─────────────────────────────────────────────────
    let server_address = cfg.network.advertised_ip()?.unwrap_or_else(local_ip);
    let record = DiscoveryRecord {
        server_address,
        port_to_clients: publisher.local_addr().port(),
        port_from_clients: collector.local_addr().port(),
    };
    let broadcaster = match DiscoveryBroadcaster::start(
        record,
        cfg.network.broadcast_target()?,
        cfg.network.broadcast_interval(),
    )
    .await
    {
        Ok(b) => Some(b),
        Err(e) => {
            // Clients can still connect with --server.
            warn!(error = %e, "discovery disabled");
            None
        }
    };

    info!(
        %server_address,
        port_to_clients = record.port_to_clients,
        port_from_clients = record.port_from_clients,
        "waiting for players.  Press Ctrl-C to exit."
    );

    // ── Arbitration loop ──────────────────────────────────────────────────────
    let mut session = Session::with_seed(cfg.server.shuffle_seed);
    let result = tokio::select! {
        outcome = run_session(&mut session, &mut collector, &publisher) => outcome.map_err(anyhow::Error::from),
        signal = tokio::signal::ctrl_c() => {
            info!("shutdown signal received, disconnecting players");
            let disconnect = session.abort();
            if let Err(e) = publisher.publish(&disconnect).await {
                warn!(error = %e, "failed to send disconnect");
            }
            signal.context("failed to listen for Ctrl-C").map(|_| disconnect)
        }
    };

    // ── Shutdown ──────────────────────────────────────────────────────────────
    if let Some(b) = broadcaster {
        b.cancel();
    }
    publisher.shutdown().await;

    let outcome = result?;
    info!(?outcome, "tic-tac-toe server stopped");
    Ok(())
}
