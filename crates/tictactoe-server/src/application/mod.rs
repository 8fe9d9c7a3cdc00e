//! Application layer use cases for the server.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (the rules in `tictactoe_core`) and the infrastructure (sockets, files).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a goal (e.g., "referee one match
//!   between two players").
//! - **Depend on abstractions** (traits) rather than concrete implementations,
//!   so the transport can be swapped in tests.
//! - **Contain no OS calls, no network I/O, no file system access**.
//!
//! # Sub-modules
//!
//! - **`arbitrate`**   – The `Session` state machine: lobby, turn order, move
//!   legality, and outcomes.  A pure step function from one client message to
//!   the server messages it causes.
//!
//! - **`run_session`** – The arbitration loop that decodes inbound text, feeds
//!   the `Session`, and publishes its replies.

pub mod arbitrate;
pub mod run_session;
