//! # tictactoe-core
//!
//! Shared library for LAN tic-tac-toe containing the game rules, the text
//! protocol codec, and the length-prefixed stream framing.
//!
//! This crate is used by both the server and the client applications.
//! It has no dependencies on terminals or sockets; the framing helpers are
//! generic over any async reader or writer.
//!
//! # Architecture overview (for beginners)
//!
//! One **server** arbitrates a single match between two **clients**.  The
//! server announces itself by UDP broadcast, collects `client/` messages from
//! the players, and publishes `server/` messages that every player receives.
//!
//! - **`domain`** – The board, its win/draw rules, and the board drawing.
//! - **`protocol`** – How messages look on the wire (`client/ 1 2 alice`,
//!   `server/ won bob`, ...) and how they are framed over TCP.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `tictactoe_core::Board` instead of `tictactoe_core::domain::board::Board`.
pub use domain::board::{Board, Cell, InvalidBoard, Player, Rejected, BOARD_SIZE};
pub use domain::game::GameState;
pub use protocol::codec::ProtocolError;
pub use protocol::frame::FrameError;
pub use protocol::messages::{ClientMessage, DiscoveryRecord, ServerMessage, DISCONNECT_REASON};
