//! Command-line interface.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::config::loader::read_config;
use crate::config::validation::validate_config;
use crate::config::{ConfigError, ProxyConfig};

#[derive(Debug, Parser)]
#[command(name = "rr-proxy", version)]
#[command(about = "Round-robin HTTP load balancer with retry and failover", long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Listen port, replacing the port of the configured bind address
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Backend URL (repeatable); replaces the configured backend list
    #[arg(short, long = "backend", value_name = "URL")]
    pub backends: Vec<String>,

    /// Log level used when RUST_LOG is unset
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    /// Read the config file (or defaults), apply overrides, then validate.
    pub fn load_config(&self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ProxyConfig::default(),
        };
        self.apply_overrides(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut ProxyConfig) {
        if let Some(port) = self.port {
            config.listener.bind_address = match config.listener.bind_address.parse::<SocketAddr>() {
                Ok(mut addr) => {
                    addr.set_port(port);
                    addr.to_string()
                }
                Err(_) => format!("0.0.0.0:{}", port),
            };
        }
        if !self.backends.is_empty() {
            config.backends = self.backends.clone();
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}
