//! Application layer use cases for the client application.
//!
//! # What use cases does the client have?
//!
//! - **`play_session`** – Plays one match: finds the server, joins, mirrors
//!   the server's turn signals, and asks the player for a move when the
//!   server says it is their turn.  The network, the player's input, and the
//!   display are injected as traits so the whole flow runs in tests without
//!   sockets or a terminal.

pub mod play_session;
