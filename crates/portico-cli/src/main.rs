//! portico CLI: serve HTTP/3 over QUIC, or generate a certificate.

mod config;
mod echo;
mod setup;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use portico_http3::Http3Server;
use portico_network::Transporter;
use portico_quic::{QuicTransport, TransportError};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::echo::EchoCore;

#[derive(Parser)]
#[command(
    name = "portico",
    about = "HTTP/3 over QUIC",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve HTTP/3 with the built-in echo handler.
    Serve {
        /// Path to configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Address to listen on, overriding the configuration.
        #[arg(short, long)]
        addr: Option<String>,
    },

    /// Generate a self-signed TLS certificate.
    GenerateCert {
        /// Output directory for certificate files.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Host name the certificate is issued for. Defaults to this machine's.
        #[arg(long)]
        hostname: Option<String>,
    },
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, addr } => {
            let (mut config, loaded) = setup::load_config(config.as_deref())?;
            init_tracing(&config.server.log_level);
            match loaded {
                Some(path) => info!(path = %path.display(), "loaded config"),
                None => info!("no config file found, using defaults"),
            }
            if let Some(addr) = addr {
                config.server.addr = addr;
            }
            serve(&config).await?;
        }
        Commands::GenerateCert { output, hostname } => {
            init_tracing("info");
            let hostname = hostname.unwrap_or_else(setup::default_hostname);
            info!(hostname = %hostname, output = %output.display(), "generating TLS certificate");

            let cert = portico_certgen::generate_certificate(&hostname)?;
            let paths = cert.write_to_dir(&output)?;

            println!("Certificate: {}", paths.cert.display());
            println!("Private key: {}", paths.key.display());
            println!("Fingerprint: {}", cert.fingerprint);
        }
    }

    Ok(())
}

/// Serve until Ctrl-C, then close the transport.
async fn serve(config: &Config) -> anyhow::Result<()> {
    let transport = Arc::new(QuicTransport::with_options(config.transport_options()));
    let server = Arc::new(Http3Server::with_options(
        Arc::new(EchoCore::new()),
        config.http3_options(),
    ));

    let mut serving = tokio::spawn({
        let transport = Arc::clone(&transport);
        async move { transport.listen_and_serve(server).await }
    });

    tokio::select! {
        result = &mut serving => return result?.map_err(Into::into),
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("shutting down");
        }
    }

    transport.shutdown().await?;
    match serving.await? {
        Ok(()) | Err(TransportError::EndpointClosed) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
