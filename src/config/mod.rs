// Configuration module entry point
// Loads layered configuration: file, then environment, then defaults

mod types;

pub use types::{Config, LoggingConfig, ServerConfig};

use crate::error::ReuseportError;
use crate::protocol::Protocol;

/// Config file name (without extension) used when none is given
pub const DEFAULT_CONFIG_PATH: &str = "reuseport";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "reuseport.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("REUSEPORT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.protocol", "tcp")?
            .set_default("server.address", "127.0.0.1:8881")?
            .set_default("server.listeners", 2)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "plain")?
            .build()?;

        settings.try_deserialize()
    }

    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// The configured protocol token, parsed
    pub fn protocol(&self) -> Result<Protocol, ReuseportError> {
        self.server.protocol.parse()
    }
}
