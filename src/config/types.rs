// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Server configuration for the demo binary
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Protocol token: tcp, tcp4, tcp6, udp, udp4 or udp6
    pub protocol: String,
    /// Address shared by every socket, "host:port"
    pub address: String,
    /// Number of sockets bound to `address`
    pub listeners: usize,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    /// Line format (plain or json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Info log file path (optional, stdout if not set)
    #[serde(default)]
    pub info_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_log_format() -> String {
    "plain".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: default_log_format(),
            info_log_file: None,
            error_log_file: None,
        }
    }
}
