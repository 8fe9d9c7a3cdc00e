//! tictactoe-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does tictactoe-client do? (for beginners)
//!
//! The client is one of the two players.  It never referees anything:
//!
//! 1. Listens on the LAN for the server's UDP announcement (or uses an
//!    address given with `--server`).
//! 2. Opens two TCP connections, one to receive `server/` broadcasts and one
//!    to send `client/` messages, and asks to join.
//! 3. Prints every board update, and when the server names this player in a
//!    `turn` message, reads a move from the terminal and sends it.
//! 4. Stops when the server announces a winner, a draw, or an error.

/// Application layer: the client session use case.
pub mod application;

/// Infrastructure layer: network, terminal, and test doubles.
pub mod infrastructure;
