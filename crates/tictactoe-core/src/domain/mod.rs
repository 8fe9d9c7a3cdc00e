//! Domain entities for LAN tic-tac-toe.
//!
//! This module contains the pure game rules with no infrastructure dependencies:
//! no sockets, no terminals, no clocks.  Everything here can be tested without
//! any external setup.
//!
//! # What lives here? (for beginners)
//!
//! - [`board::Board`] is the 3×3 grid.  It knows how to apply a move, detect a
//!   winner or a draw, and convert itself to and from the text drawing that
//!   travels inside `update` messages.
//! - [`game::GameState`] pairs a board with the symbol due to move.  The server
//!   keeps one per match.
//!
//! Code in outer layers (the server's arbitration loop, the client's terminal
//! UI) depends on this module, never the other way round.

pub mod board;
pub mod game;
