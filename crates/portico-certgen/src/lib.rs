//! Self-signed TLS certificates for portico.
//!
//! Used when a server is started without certificate material of its own,
//! and by tests that need a loopback QUIC endpoint. Certificates are
//! reported with their SHA-256 fingerprint so clients can pin them.

pub mod error;

pub use error::CertgenError;

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};

use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair, SanType};

/// File name of the certificate written by [`GeneratedCert::write_to_dir`].
pub const CERT_FILE_NAME: &str = "portico.crt";
/// File name of the private key written by [`GeneratedCert::write_to_dir`].
pub const KEY_FILE_NAME: &str = "portico.key";

/// A generated certificate and private key pair.
#[derive(Debug, Clone)]
pub struct GeneratedCert {
    /// PEM-encoded certificate.
    pub cert_pem: String,
    /// PEM-encoded PKCS#8 private key.
    pub key_pem: String,
    /// DER-encoded certificate, for building trust stores.
    pub cert_der: Vec<u8>,
    /// SHA-256 fingerprint of `cert_der`.
    pub fingerprint: String,
}

/// Where a certificate pair was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificatePaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl GeneratedCert {
    /// Write the pair as `portico.crt` and `portico.key` into `dir`,
    /// creating the directory if needed.
    pub fn write_to_dir(&self, dir: &Path) -> Result<CertificatePaths, CertgenError> {
        std::fs::create_dir_all(dir).map_err(|source| CertgenError::Write {
            path: dir.to_path_buf(),
            source,
        })?;

        let paths = CertificatePaths {
            cert: dir.join(CERT_FILE_NAME),
            key: dir.join(KEY_FILE_NAME),
        };
        write_file(&paths.cert, &self.cert_pem)?;
        write_file(&paths.key, &self.key_pem)?;
        Ok(paths)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), CertgenError> {
    std::fs::write(path, contents).map_err(|source| CertgenError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Generate a new self-signed certificate.
///
/// The certificate is valid for `hostname` and additionally lists
/// `localhost`, `127.0.0.1` and `::1` as subject alternative names.
pub fn generate_certificate(hostname: &str) -> Result<GeneratedCert, CertgenError> {
    let key_pair = KeyPair::generate().map_err(|e| CertgenError::Generation(e.to_string()))?;

    let mut params = CertificateParams::default();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, hostname);
    dn.push(DnType::OrganizationName, "portico");
    params.distinguished_name = dn;

    let mut names = vec![dns_name(hostname)?];
    if hostname != "localhost" {
        names.push(dns_name("localhost")?);
    }
    names.push(SanType::IpAddress(IpAddr::V4(Ipv4Addr::LOCALHOST)));
    names.push(SanType::IpAddress(IpAddr::V6(Ipv6Addr::LOCALHOST)));
    params.subject_alt_names = names;

    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| CertgenError::Generation(e.to_string()))?;

    Ok(GeneratedCert {
        cert_pem: cert.pem(),
        key_pem: key_pair.serialize_pem(),
        cert_der: cert.der().to_vec(),
        fingerprint: sha256_fingerprint(cert.der()),
    })
}

fn dns_name(name: &str) -> Result<SanType, CertgenError> {
    Ok(SanType::DnsName(name.try_into().map_err(
        |e: rcgen::Error| CertgenError::Generation(e.to_string()),
    )?))
}

/// Compute SHA-256 fingerprint of DER-encoded certificate bytes.
fn sha256_fingerprint(der: &[u8]) -> String {
    use std::fmt::Write;
    let digest = ring::digest::digest(&ring::digest::SHA256, der);
    let mut fingerprint = String::from("SHA256:");
    for (i, byte) in digest.as_ref().iter().enumerate() {
        if i > 0 {
            fingerprint.push(':');
        }
        let _ = write!(fingerprint, "{byte:02x}");
    }
    fingerprint
}
