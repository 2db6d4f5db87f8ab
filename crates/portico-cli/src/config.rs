//! Server configuration loaded from TOML.

use std::path::PathBuf;

use portico_http3::{Http3Options, DEFAULT_MAX_BODY_SIZE};
use portico_quic::{QuicTuning, TransportOptions};
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub quic: QuicTuning,
    #[serde(default)]
    pub http3: Http3Config,
}

/// Listener and TLS settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default)]
    pub cert_file: Option<PathBuf>,
    #[serde(default)]
    pub key_file: Option<PathBuf>,
    #[serde(default)]
    pub enable_datagrams: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            cert_file: None,
            key_file: None,
            enable_datagrams: false,
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Http3Config {
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl Default for Http3Config {
    fn default() -> Self {
        Self {
            max_body_size: default_max_body_size(),
        }
    }
}

impl Config {
    /// Transport options for the `[server]` and `[quic]` sections.
    pub fn transport_options(&self) -> TransportOptions {
        let mut options = TransportOptions::new(self.server.addr.clone())
            .with_quic(self.quic.clone())
            .with_datagrams(self.server.enable_datagrams);
        options.cert_file.clone_from(&self.server.cert_file);
        options.key_file.clone_from(&self.server.key_file);
        options
    }

    pub fn http3_options(&self) -> Http3Options {
        Http3Options {
            max_body_size: self.http3.max_body_size,
        }
    }
}

fn default_addr() -> String {
    "0.0.0.0:4433".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_body_size() -> usize {
    DEFAULT_MAX_BODY_SIZE
}
