//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the TOML configuration from the
//! platform-appropriate directory (or a path given on the command line) and
//! falls back to defaults when the file does not exist yet.

pub mod config;
