//! Server configuration
//!
//! Defaults, an optional TOML file named by `TCP_CHAT_CONFIG`, then
//! environment overrides. The listen address can also come from the command
//! line (see `main.rs`).

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::AppError;

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8989";

/// Default maximum number of simultaneously registered clients
pub const DEFAULT_MAX_CLIENTS: usize = 10;

/// Default router input queue size
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Default per-connection outbound queue size
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 32;

pub const DEFAULT_BANNER_PATH: &str = "welcome-text.txt";
pub const DEFAULT_SNAPSHOT_PATH: &str = "msglogs.json";

/// Environment variable naming the TOML config file
pub const CONFIG_ENV: &str = "TCP_CHAT_CONFIG";

/// Server settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to listen on (host:port)
    pub listen_addr: String,
    /// Maximum number of simultaneously registered clients
    pub max_clients: usize,
    /// Pending messages the router queue holds before readers wait
    pub queue_capacity: usize,
    /// Pending writes per connection before the router waits
    pub outbound_capacity: usize,
    /// File sent to every new connection
    pub welcome_banner: PathBuf,
    /// File the message log is written to on a log request
    pub snapshot_path: PathBuf,
    /// Free a username when its connection leaves
    pub allow_name_reuse_after_departure: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_ADDR.to_string(),
            max_clients: DEFAULT_MAX_CLIENTS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            welcome_banner: PathBuf::from(DEFAULT_BANNER_PATH),
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            allow_name_reuse_after_departure: false,
        }
    }
}

impl ServerConfig {
    /// Load from `TCP_CHAT_CONFIG` (if set) and the process environment
    pub fn load() -> Result<Self, AppError> {
        let mut config = match env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        debug!("Reading config from {}", path.display());
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, AppError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `TCP_CHAT_*` overrides looked up through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("TCP_CHAT_ADDR") {
            self.listen_addr = addr;
        }
        if let Some(v) = lookup("TCP_CHAT_MAX_CLIENTS") {
            self.max_clients = parse_number("TCP_CHAT_MAX_CLIENTS", &v)?;
        }
        if let Some(v) = lookup("TCP_CHAT_QUEUE_CAPACITY") {
            self.queue_capacity = parse_number("TCP_CHAT_QUEUE_CAPACITY", &v)?;
        }
        if let Some(v) = lookup("TCP_CHAT_BANNER") {
            self.welcome_banner = PathBuf::from(v);
        }
        if let Some(v) = lookup("TCP_CHAT_SNAPSHOT") {
            self.snapshot_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("TCP_CHAT_ALLOW_NAME_REUSE") {
            self.allow_name_reuse_after_departure = parse_bool("TCP_CHAT_ALLOW_NAME_REUSE", &v)?;
        }
        Ok(())
    }

    /// Use a command line argument as the listen address
    ///
    /// A bare port binds on localhost, anything else is taken as host:port.
    pub fn set_listen_arg(&mut self, arg: &str) {
        self.listen_addr = if arg.parse::<u16>().is_ok() {
            format!("127.0.0.1:{}", arg)
        } else {
            arg.to_string()
        };
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_clients == 0 {
            return Err(AppError::Config("max_clients must be at least 1".into()));
        }
        if self.queue_capacity == 0 || self.outbound_capacity == 0 {
            return Err(AppError::Config("queue capacities must be at least 1".into()));
        }
        Ok(())
    }
}

fn parse_number(key: &str, value: &str) -> Result<usize, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{} must be a number, got '{}'", key, value)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::Config(format!(
            "{} must be true or false, got '{}'",
            key, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr, DEFAULT_ADDR);
        assert_eq!(config.max_clients, 10);
        assert_eq!(config.queue_capacity, 10);
        assert!(!config.allow_name_reuse_after_departure);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = ServerConfig::from_toml_str(
            r#"
            max_clients = 3
            snapshot_path = "/tmp/logs.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.max_clients, 3);
        assert_eq!(config.snapshot_path, PathBuf::from("/tmp/logs.json"));
        assert_eq!(config.welcome_banner, PathBuf::from(DEFAULT_BANNER_PATH));
    }

    #[test]
    fn test_unknown_toml_key() {
        assert!(matches!(
            ServerConfig::from_toml_str("max_users = 3"),
            Err(AppError::Toml(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TCP_CHAT_MAX_CLIENTS", "4"),
            ("TCP_CHAT_ALLOW_NAME_REUSE", "yes"),
            ("TCP_CHAT_BANNER", "banner.txt"),
        ]
        .into_iter()
        .collect();

        let mut config = ServerConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.max_clients, 4);
        assert!(config.allow_name_reuse_after_departure);
        assert_eq!(config.welcome_banner, PathBuf::from("banner.txt"));
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_bad_override() {
        let mut config = ServerConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "TCP_CHAT_MAX_CLIENTS").then(|| "many".to_string())
        });
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_listen_arg() {
        let mut config = ServerConfig::default();
        config.set_listen_arg("2525");
        assert_eq!(config.listen_addr, "127.0.0.1:2525");

        config.set_listen_arg("0.0.0.0:9000");
        assert_eq!(config.listen_addr, "0.0.0.0:9000");
    }

    #[test]
    fn test_zero_capacity_invalid() {
        let config = ServerConfig {
            max_clients: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }
}
