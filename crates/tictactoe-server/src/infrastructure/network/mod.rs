//! Network infrastructure for the server.
//!
//! # Sub-modules
//!
//! - **`discovery`** – Periodically broadcasts the server's address and ports
//!   over UDP so clients can find it without manual configuration.
//!
//! - **`pubsub`** – The TCP publish/subscribe transport: a `Publisher` fanning
//!   `server/` messages out to every subscriber and a `Collector` funnelling
//!   `client/` messages into the arbitration loop.

pub mod discovery;
pub mod pubsub;
