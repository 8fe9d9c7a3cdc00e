//! LAN tic-tac-toe terminal client entry point.
//!
//! ```text
//! main()
//!  └─ parse flags, init logging
//!  └─ ask for a username if none was given
//!  └─ play()
//!       ├─ discover (UDP, bounded wait) or use --server
//!       ├─ connect both streams, send join
//!       └─ poll broadcasts / prompt for moves until game over
//!  └─ Ctrl-C: resign if connected, otherwise just exit
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                            | Flag                       |
//! |-------------------------------------|----------------------------|
//! | `TICTACTOE_USERNAME`                | `--username`               |
//! | `TICTACTOE_SERVER`                  | `--server`                 |
//! | `TICTACTOE_DISCOVERY_PORT`          | `--discovery-port`         |
//! | `TICTACTOE_DISCOVERY_TIMEOUT_SECS`  | `--discovery-timeout-secs` |
//! | `TICTACTOE_LOG_LEVEL`               | `--log-level`              |

use std::net::IpAddr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tictactoe_client::application::play_session::{play, ClientConfig, ClientError, ClientSession};
use tictactoe_client::infrastructure::network::LanNetwork;
use tictactoe_client::infrastructure::terminal::{StdinInput, TerminalView};
use tictactoe_core::DiscoveryRecord;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// LAN tic-tac-toe client.
///
/// Finds the server on the local network, joins the match, and plays from
/// the terminal.
#[derive(Debug, Parser)]
#[command(name = "tictactoe-client", version)]
struct Cli {
    /// Name to play under (single word).  Prompted for when omitted.
    #[arg(long, env = "TICTACTOE_USERNAME")]
    username: Option<String>,

    /// Server address; skips discovery and uses the default game ports.
    #[arg(long, env = "TICTACTOE_SERVER")]
    server: Option<IpAddr>,

    /// UDP port to listen for server announcements on.
    #[arg(long, env = "TICTACTOE_DISCOVERY_PORT")]
    discovery_port: Option<u16>,

    /// Seconds to wait for a server announcement.
    #[arg(long, env = "TICTACTOE_DISCOVERY_TIMEOUT_SECS")]
    discovery_timeout_secs: Option<u64>,

    /// Log level when `RUST_LOG` is unset.  Logs go to stderr.
    #[arg(long, env = "TICTACTOE_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

impl Cli {
    fn config(&self) -> ClientConfig {
        let mut cfg = ClientConfig::default();
        if let Some(port) = self.discovery_port {
            cfg.discovery_port = port;
        }
        if let Some(secs) = self.discovery_timeout_secs {
            cfg.discovery_timeout = Duration::from_secs(secs);
        }
        cfg
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let config = cli.config();
    let mut input = StdinInput::new();

    let username = match cli.username {
        Some(name) => name,
        None => input
            .prompt_line("Enter your username: ")
            .await
            .context("no username entered")?,
    };
    let mut session = ClientSession::new(username.trim()).context("invalid username")?;
    let mut view = TerminalView::new(session.username());

    let mut network = match cli.server {
        Some(ip) => LanNetwork::with_server(&config, DiscoveryRecord::with_default_ports(ip)),
        None => LanNetwork::new(&config),
    };

    let (stop, mut shutdown) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = stop.send(true);
        }
    });

    info!(username = %session.username(), "tic-tac-toe client starting");
    match play(
        &mut session,
        &mut network,
        &mut input,
        &mut view,
        &config,
        &mut shutdown,
    )
    .await
    {
        Ok(outcome) => {
            info!(?outcome, "tic-tac-toe client stopped");
            Ok(())
        }
        Err(ClientError::Interrupted) => {
            println!("\nExiting game.");
            Ok(())
        }
        Err(ClientError::DiscoveryTimeout(waited)) => {
            println!("No server found. Exiting.");
            Err(ClientError::DiscoveryTimeout(waited)).context("server discovery failed")
        }
        Err(e) => Err(e).context("game aborted"),
    }
}
