//! All tic-tac-toe protocol message types.
//!
//! Messages are single UTF-8 lines of whitespace-separated tokens, prefixed
//! by a topic token so a subscriber can ignore traffic meant for someone else:
//!
//! | Topic        | Direction        | Bodies                                               |
//! |--------------|------------------|------------------------------------------------------|
//! | `client/`    | client → server  | `request join <u>`, `<col> <row> <u>`, `resign <u>`  |
//! | `server/`    | server → clients | `joined <u>`, `update <drawing>`, `turn <u>`, `won <u>`, `draw`, `error <reason>` |
//! | `broadcast/` | UDP discovery    | `server_info <ip> <port_to_clients> <port_from_clients>` |
//!
//! The `update` body is the only one that is not a flat token list: its
//! payload is the five-line board drawing, carried verbatim.

use std::net::IpAddr;

use crate::domain::board::Board;

// ── Protocol constants ────────────────────────────────────────────────────────

/// Topic prefix of every client → server message.
pub const CLIENT_TOPIC: &str = "client/";

/// Topic prefix of every server → client message.
pub const SERVER_TOPIC: &str = "server/";

/// Topic prefix of the UDP discovery announcement.
pub const DISCOVERY_TOPIC: &str = "broadcast/";

/// Default UDP port the server announces itself on.
pub const DEFAULT_DISCOVERY_PORT: u16 = 41110;

/// Default TCP port clients subscribe to for server messages.
pub const DEFAULT_PORT_TO_CLIENTS: u16 = 41111;

/// Default TCP port clients publish their messages to.
pub const DEFAULT_PORT_FROM_CLIENTS: u16 = 41112;

// ── Client → server ───────────────────────────────────────────────────────────

/// A message published by a player on the `client/` topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// `request join <username>`
    Join { username: String },
    /// `<col> <row> <username>`; coordinates are 0-indexed and are *not*
    /// range-checked here, the server forfeits out-of-range moves.
    Move { col: i32, row: i32, username: String },
    /// `resign <username>`
    Resign { username: String },
}

impl ClientMessage {
    /// The player the message claims to come from.
    pub fn username(&self) -> &str {
        match self {
            ClientMessage::Join { username }
            | ClientMessage::Move { username, .. }
            | ClientMessage::Resign { username } => username,
        }
    }
}

// ── Server → client ───────────────────────────────────────────────────────────

/// A message broadcast by the server on the `server/` topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// A player was admitted to the lobby.
    Joined(String),
    /// The board after the latest accepted move (or the empty starting board).
    Update(Board),
    /// The named player must move next.
    Turn(String),
    /// The named player won, by line, resignation, or forfeit.
    Won(String),
    /// The board filled up with no winner.
    Draw,
    /// The session is being torn down; the reason is free text (e.g. `disconnect`).
    Error(String),
}

impl ServerMessage {
    /// `true` for messages after which the session is finished.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            ServerMessage::Won(_) | ServerMessage::Draw | ServerMessage::Error(_)
        )
    }
}

/// Reason carried by the `error` message the server sends before shutting down.
pub const DISCONNECT_REASON: &str = "disconnect";

// ── Discovery ─────────────────────────────────────────────────────────────────

/// How to reach a running server, as announced over UDP broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryRecord {
    /// Address clients should connect to.
    pub server_address: IpAddr,
    /// Port on which the server publishes `server/` messages.
    pub port_to_clients: u16,
    /// Port on which the server collects `client/` messages.
    pub port_from_clients: u16,
}

impl DiscoveryRecord {
    /// A record pointing at `server_address` on the default game ports.
    pub fn with_default_ports(server_address: IpAddr) -> Self {
        Self {
            server_address,
            port_to_clients: DEFAULT_PORT_TO_CLIENTS,
            port_from_clients: DEFAULT_PORT_FROM_CLIENTS,
        }
    }
}
