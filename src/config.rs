//! Configuration module for the linecho server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use crate::protocols::echo::SessionConfig;
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Command-line arguments for the echo server
#[derive(Parser, Debug)]
#[command(name = "linecho")]
#[command(author = "linecho authors")]
#[command(version = "0.1.0")]
#[command(about = "A newline-delimited TCP echo server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 127.0.0.1:1234)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Most bytes taken from the socket per read
    #[arg(long)]
    pub read_chunk_size: Option<usize>,

    /// Longest accepted line in bytes, newline excluded; longer lines get
    /// an error reply and the client is dropped
    #[arg(long)]
    pub max_line_length: Option<usize>,

    /// Line that makes the server say goodbye and close the connection
    #[arg(long)]
    pub sentinel: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Most bytes taken from the socket per read
    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            read_chunk_size: default_read_chunk_size(),
        }
    }
}

/// Echo protocol configuration
#[derive(Debug, Deserialize)]
pub struct ProtocolConfig {
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
    #[serde(default = "default_farewell")]
    pub farewell: String,
    /// Longest accepted line, newline excluded
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            sentinel: default_sentinel(),
            farewell: default_farewell(),
            max_line_length: default_max_line_length(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:1234".to_string()
}

fn default_read_chunk_size() -> usize {
    16 * 1024
}

fn default_sentinel() -> String {
    "Muthiti!".to_string()
}

fn default_farewell() -> String {
    "Muthiti uu twonane ivinda yingi!\n".to_string()
}

fn default_max_line_length() -> usize {
    64 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub read_chunk_size: usize,
    pub max_line_length: usize,
    pub sentinel: String,
    pub farewell: String,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        let config = Self::merge(cli, toml_config);
        config.validate()?;
        Ok(config)
    }

    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        Config {
            listen: cli.listen.unwrap_or(toml_config.server.listen),
            read_chunk_size: cli
                .read_chunk_size
                .unwrap_or(toml_config.server.read_chunk_size),
            max_line_length: cli
                .max_line_length
                .unwrap_or(toml_config.protocol.max_line_length),
            sentinel: cli.sentinel.unwrap_or(toml_config.protocol.sentinel),
            farewell: toml_config.protocol.farewell,
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.read_chunk_size == 0 {
            return Err(ConfigError::Invalid("read_chunk_size must be at least 1"));
        }
        if self.max_line_length == 0 {
            return Err(ConfigError::Invalid("max_line_length must be at least 1"));
        }
        if self.sentinel.trim().is_empty() {
            return Err(ConfigError::Invalid("sentinel must not be blank"));
        }
        Ok(())
    }

    /// Protocol settings handed to every session.
    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            sentinel: self.sentinel.trim().to_string(),
            farewell: self.farewell.clone(),
            max_line_length: self.max_line_length,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    FileRead(PathBuf, std::io::Error),
    #[error("Failed to parse config file '{}': {}", .0.display(), .1)]
    TomlParse(PathBuf, toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}
