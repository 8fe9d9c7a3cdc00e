//! Infrastructure layer for the client application.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `tictactoe_core`, but MUST NOT be imported by the `application` layer
//! outside of tests.
//!
//! # Sub-modules
//!
//! - **`network`** – UDP discovery listener and the TCP link to the server.
//! - **`terminal`** – stdin command reader and stdout board renderer.
//! - **`mock`** – scripted network, input, and view for tests.

pub mod mock;
pub mod network;
pub mod terminal;
