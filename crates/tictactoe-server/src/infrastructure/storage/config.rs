//! TOML-based configuration for the server.
//!
//! Reads `ServerConfig` from the platform-appropriate config file:
//! - Windows:  `%APPDATA%\TicTacToe\server.toml`
//! - Linux:    `~/.config/tictactoe/server.toml`
//! - macOS:    `~/Library/Application Support/TicTacToe/server.toml`
//!
//! A different file can be given with `--config`.  A missing file means
//! "use the defaults"; a missing field falls back to its default:
//!
//! ```toml
//! [server]
//! log_level = "debug"
//! shuffle_seed = 7
//!
//! [network]
//! discovery_port = 41110
//! port_to_clients = 41111
//! port_from_clients = 41112
//! advertised_address = "192.168.1.20"
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tictactoe_core::protocol::{
    DEFAULT_DISCOVERY_PORT, DEFAULT_PORT_FROM_CLIENTS, DEFAULT_PORT_TO_CLIENTS,
};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// An address field holds something that is not an IP address.
    #[error("invalid address {value:?} in [network].{field}")]
    InvalidAddress { field: &'static str, value: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level server configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub network: NetworkConfig,
}

/// General server behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Fixed seed for the first-mover shuffle; random when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shuffle_seed: Option<u64>,
}

/// Ports and addresses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// UDP port announcements are sent to.
    #[serde(default = "default_discovery_port")]
    pub discovery_port: u16,
    /// TCP port clients subscribe on.
    #[serde(default = "default_port_to_clients")]
    pub port_to_clients: u16,
    /// TCP port clients publish to.
    #[serde(default = "default_port_from_clients")]
    pub port_from_clients: u16,
    /// Destination address of the announcement datagrams.
    #[serde(default = "default_broadcast_address")]
    pub broadcast_address: String,
    /// Interface the two TCP listeners bind to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Address put in the announcement; detected when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertised_address: Option<String>,
    /// Milliseconds between two announcements.
    #[serde(default = "default_broadcast_interval_ms")]
    pub broadcast_interval_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_discovery_port() -> u16 {
    DEFAULT_DISCOVERY_PORT
}
fn default_port_to_clients() -> u16 {
    DEFAULT_PORT_TO_CLIENTS
}
fn default_port_from_clients() -> u16 {
    DEFAULT_PORT_FROM_CLIENTS
}
fn default_broadcast_address() -> String {
    "255.255.255.255".to_string()
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_broadcast_interval_ms() -> u64 {
    1000
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            shuffle_seed: None,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            discovery_port: default_discovery_port(),
            port_to_clients: default_port_to_clients(),
            port_from_clients: default_port_from_clients(),
            broadcast_address: default_broadcast_address(),
            bind_address: default_bind_address(),
            advertised_address: None,
            broadcast_interval_ms: default_broadcast_interval_ms(),
        }
    }
}

impl NetworkConfig {
    /// Where the publisher listener binds.
    pub fn publisher_addr(&self) -> Result<SocketAddr, ConfigError> {
        Ok(SocketAddr::new(self.bind_ip()?, self.port_to_clients))
    }

    /// Where the collector listener binds.
    pub fn collector_addr(&self) -> Result<SocketAddr, ConfigError> {
        Ok(SocketAddr::new(self.bind_ip()?, self.port_from_clients))
    }

    /// Destination of discovery datagrams.
    pub fn broadcast_target(&self) -> Result<SocketAddr, ConfigError> {
        let ip = parse_ip("broadcast_address", &self.broadcast_address)?;
        Ok(SocketAddr::new(ip, self.discovery_port))
    }

    /// The configured advertised address, if any.
    pub fn advertised_ip(&self) -> Result<Option<IpAddr>, ConfigError> {
        self.advertised_address
            .as_deref()
            .map(|v| parse_ip("advertised_address", v))
            .transpose()
    }

    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_interval_ms)
    }

    fn bind_ip(&self) -> Result<IpAddr, ConfigError> {
        parse_ip("bind_address", &self.bind_address)
    }
}

fn parse_ip(field: &'static str, value: &str) -> Result<IpAddr, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidAddress {
        field,
        value: value.to_string(),
    })
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the default config file path.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("server.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// `path` if given, otherwise [`config_file_path`].
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if `path` is `None` and the
/// base directory cannot be determined.
pub fn resolve_config_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match path {
        Some(p) => Ok(p.to_path_buf()),
        None => config_file_path(),
    }
}

/// Loads the config from `path`, or from [`config_file_path`] when `None`.
///
/// Returns `ServerConfig::default()` if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    let path = resolve_config_path(path)?;

    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ServerConfig::default()),
        Err(source) => Err(ConfigError::Io { path, source }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &ServerConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("TicTacToe"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("tictactoe"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("TicTacToe")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("tictactoe_{tag}_{}_{nanos}", std::process::id()))
    }

    #[test]
    fn test_default_config_uses_protocol_ports() {
        // Arrange / Act
        let cfg = ServerConfig::default();

        // Assert
        assert_eq!(cfg.network.discovery_port, 41110);
        assert_eq!(cfg.network.port_to_clients, 41111);
        assert_eq!(cfg.network.port_from_clients, 41112);
        assert_eq!(cfg.network.broadcast_interval(), Duration::from_secs(1));
        assert_eq!(cfg.server.log_level, "info");
        assert_eq!(cfg.server.shuffle_seed, None);
    }

    #[test]
    fn test_default_addresses_resolve() {
        let net = NetworkConfig::default();
        assert_eq!(
            net.publisher_addr().unwrap(),
            "0.0.0.0:41111".parse().unwrap()
        );
        assert_eq!(
            net.collector_addr().unwrap(),
            "0.0.0.0:41112".parse().unwrap()
        );
        assert_eq!(
            net.broadcast_target().unwrap(),
            "255.255.255.255:41110".parse().unwrap()
        );
        assert_eq!(net.advertised_ip().unwrap(), None);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg: ServerConfig = toml::from_str("").expect("empty config");
        assert_eq!(cfg, ServerConfig::default());
    }

    #[test]
    fn test_partial_network_section_overrides_defaults() {
        // Arrange
        let toml_str = r#"
[server]
shuffle_seed = 42

[network]
port_to_clients = 5000
advertised_address = "10.0.0.9"
"#;

        // Act
        let cfg: ServerConfig = toml::from_str(toml_str).expect("partial config");

        // Assert
        assert_eq!(cfg.server.shuffle_seed, Some(42));
        assert_eq!(cfg.network.port_to_clients, 5000);
        assert_eq!(cfg.network.port_from_clients, 41112);
        assert_eq!(
            cfg.network.advertised_ip().unwrap(),
            Some("10.0.0.9".parse().unwrap())
        );
    }

    #[test]
    fn test_bad_address_is_reported_with_field_name() {
        let net = NetworkConfig {
            bind_address: "localhost-ish".into(),
            ..NetworkConfig::default()
        };
        let err = net.publisher_addr().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidAddress {
                field: "bind_address",
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_toml_returns_parse_error() {
        let dir = temp_dir("bad");
        let path = dir.join("server.toml");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        let result = load_config(Some(&path));

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_config_returns_default_when_file_absent() {
        let path = temp_dir("absent").join("server.toml");
        assert_eq!(load_config(Some(&path)).unwrap(), ServerConfig::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        // Arrange
        let dir = temp_dir("roundtrip");
        let path = dir.join("nested").join("server.toml");
        let mut cfg = ServerConfig::default();
        cfg.network.discovery_port = 50000;
        cfg.server.log_level = "debug".into();

        // Act
        save_config(&cfg, &path).unwrap();
        let loaded = load_config(Some(&path)).unwrap();

        // Assert
        assert_eq!(loaded, cfg);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("shuffle_seed"), "None seed must be omitted");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_resolve_config_path_prefers_explicit_path() {
        let explicit = temp_dir("explicit").join("custom.toml");
        assert_eq!(resolve_config_path(Some(&explicit)).unwrap(), explicit);
        if let Ok(default) = resolve_config_path(None) {
            assert_eq!(default, config_file_path().unwrap());
        }
    }

    #[test]
    fn test_saved_overrides_win_over_defaults_on_next_load() {
        // Arrange: what `--write-config --seed 7 --discovery-port 41111` stores.
        let dir = temp_dir("overrides");
        let path = resolve_config_path(Some(&dir.join("server.toml"))).unwrap();
        let mut cfg = load_config(Some(&path)).unwrap();
        cfg.server.shuffle_seed = Some(7);
        cfg.network.discovery_port = 41111;

        // Act
        save_config(&cfg, &path).unwrap();
        let reloaded = load_config(Some(&path)).unwrap();

        // Assert
        assert_eq!(reloaded.server.shuffle_seed, Some(7));
        assert_eq!(reloaded.network.discovery_port, 41111);
        assert_eq!(reloaded.network.port_to_clients, cfg.network.port_to_clients);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_config_file_path_ends_with_server_toml() {
        if let Ok(path) = config_file_path() {
            assert!(path.ends_with("server.toml"), "got {path:?}");
        }
    }
}
