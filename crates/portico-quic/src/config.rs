//! Transport options and QUIC tuning.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use quinn::{IdleTimeout, VarInt};
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Address used when none is configured: every interface, the HTTPS port.
pub const DEFAULT_ADDR: &str = ":https";

/// QUIC transport parameters a caller may override.
///
/// Unset fields keep quinn's defaults. Datagrams are off unless enabled here
/// or through [`TransportOptions::enable_datagrams`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuicTuning {
    #[serde(default)]
    pub max_idle_timeout_ms: Option<u64>,
    #[serde(default)]
    pub keep_alive_interval_ms: Option<u64>,
    #[serde(default)]
    pub max_concurrent_bidi_streams: Option<u32>,
    #[serde(default)]
    pub max_concurrent_uni_streams: Option<u32>,
    #[serde(default)]
    pub enable_datagrams: bool,
}

impl QuicTuning {
    /// Build the quinn transport configuration these settings describe.
    pub fn to_transport_config(&self) -> Result<quinn::TransportConfig, TransportError> {
        let mut config = quinn::TransportConfig::default();

        if let Some(ms) = self.max_idle_timeout_ms {
            let timeout = IdleTimeout::try_from(Duration::from_millis(ms))
                .map_err(|e| TransportError::Config(format!("max_idle_timeout_ms: {e}")))?;
            config.max_idle_timeout(Some(timeout));
        }
        if let Some(ms) = self.keep_alive_interval_ms {
            config.keep_alive_interval(Some(Duration::from_millis(ms)));
        }
        if let Some(n) = self.max_concurrent_bidi_streams {
            config.max_concurrent_bidi_streams(VarInt::from_u32(n));
        }
        if let Some(n) = self.max_concurrent_uni_streams {
            config.max_concurrent_uni_streams(VarInt::from_u32(n));
        }
        if !self.enable_datagrams {
            config.datagram_receive_buffer_size(None);
        }

        Ok(config)
    }
}

/// Everything a [`QuicTransport`](crate::QuicTransport) is built from.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Address to bind, `host:port` or `:port`. Ports may be named
    /// (`https`, `http`). Empty means [`DEFAULT_ADDR`].
    pub addr: String,
    /// Full TLS configuration. Takes precedence over the file pair.
    pub tls: Option<Arc<rustls::ServerConfig>>,
    /// PEM certificate chain used when `tls` is unset.
    pub cert_file: Option<PathBuf>,
    /// PEM private key used when `tls` is unset.
    pub key_file: Option<PathBuf>,
    pub quic: Option<QuicTuning>,
    /// Force QUIC datagram support on, whatever `quic` says.
    pub enable_datagrams: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            tls: None,
            cert_file: None,
            key_file: None,
            quic: None,
            enable_datagrams: false,
        }
    }
}

impl TransportOptions {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_tls(mut self, tls: Arc<rustls::ServerConfig>) -> Self {
        self.tls = Some(tls);
        self
    }

    #[must_use]
    pub fn with_cert_files(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.cert_file = Some(cert.into());
        self.key_file = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_quic(mut self, quic: QuicTuning) -> Self {
        self.quic = Some(quic);
        self
    }

    #[must_use]
    pub fn with_datagrams(mut self, enable: bool) -> Self {
        self.enable_datagrams = enable;
        self
    }

    /// The tuning actually applied: a copy of the caller's, or defaults,
    /// with datagrams forced on when requested.
    pub fn effective_quic(&self) -> QuicTuning {
        let mut quic = self.quic.clone().unwrap_or_default();
        if self.enable_datagrams {
            quic.enable_datagrams = true;
        }
        quic
    }
}

/// Resolve a bind address in `host:port` or `:port` form.
///
/// Host names go through tokio's resolver, off the runtime's worker threads.
pub async fn resolve_bind_addr(addr: &str) -> Result<SocketAddr, TransportError> {
    let addr = if addr.is_empty() { DEFAULT_ADDR } else { addr };
    let invalid = |reason: String| TransportError::Address {
        addr: addr.to_string(),
        reason,
    };

    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| invalid("missing port".to_string()))?;
    let host = match host {
        "" => "0.0.0.0",
        h => h.trim_start_matches('[').trim_end_matches(']'),
    };
    let port = match port {
        "https" => 443,
        "http" => 80,
        p => p
            .parse::<u16>()
            .map_err(|e| invalid(format!("bad port: {e}")))?,
    };

    tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| invalid(e.to_string()))?
        .next()
        .ok_or_else(|| invalid("host resolved to no addresses".to_string()))
}
