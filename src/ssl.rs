use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use native_tls::{HandshakeError, TlsConnector};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration as StdDuration, Instant};
use tracing::{debug, error, info, instrument, trace, warn};
use url::Url;
use x509_parser::prelude::*;

use crate::features::LookupError;

const CONNECTION_TIMEOUT_SECS: u64 = 5;
const DEFAULT_PORT: u16 = 443;

/// Fields read from a verified peer certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    pub issuer: String,
    pub subject: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
}

/// Performs a verified TLS handshake for a URL
///
/// `Ok(Some(_))` means the handshake verified and the server presented a
/// certificate, `Ok(None)` that it verified without one. Any verification or
/// connection problem is an error.
#[async_trait]
pub trait CertificateProbe: Send + Sync {
    async fn probe(&self, url: &str) -> Result<Option<CertificateInfo>, LookupError>;
}

/// `CertificateProbe` using the platform TLS stack via native-tls
pub struct NativeTlsProbe {
    timeout: StdDuration,
}

impl NativeTlsProbe {
    pub fn new(timeout: StdDuration) -> Self {
        Self { timeout }
    }
}

impl Default for NativeTlsProbe {
    fn default() -> Self {
        Self::new(StdDuration::from_secs(CONNECTION_TIMEOUT_SECS))
    }
}

#[async_trait]
impl CertificateProbe for NativeTlsProbe {
    #[instrument(level = "debug", skip(self))]
    async fn probe(&self, url: &str) -> Result<Option<CertificateInfo>, LookupError> {
        let (host, port) = handshake_target(url)?;
        let timeout = self.timeout;

        let task = tokio::task::spawn_blocking(move || fetch_certificate(&host, port, timeout));
        match tokio::time::timeout(timeout, task).await {
            Err(_) => Err(LookupError::Timeout(timeout.as_secs())),
            Ok(Err(e)) => Err(LookupError::Network(format!("TLS task failed: {}", e))),
            Ok(Ok(result)) => result,
        }
    }
}

/// Host and port to handshake with: the URL's port for https, 443 otherwise
pub fn handshake_target(url: &str) -> Result<(String, u16), LookupError> {
    let parsed =
        Url::parse(url).map_err(|e| LookupError::InvalidTarget(format!("{}: {}", url, e)))?;
    let host = match parsed.host_str() {
        Some(host) if !host.is_empty() => {
            host.trim_start_matches('[').trim_end_matches(']').to_string()
        }
        _ => return Err(LookupError::InvalidTarget(format!("{}: URL has no host", url))),
    };
    let port = if parsed.scheme() == "https" {
        parsed.port().unwrap_or(DEFAULT_PORT)
    } else {
        DEFAULT_PORT
    };
    trace!("Handshake target for {}: {}:{}", url, host, port);
    Ok((host, port))
}

/// Connects with verification enabled and reads the peer certificate
///
/// Connect, handshake and socket reads share one deadline `timeout` from now.
fn fetch_certificate(
    host: &str,
    port: u16,
    timeout: StdDuration,
) -> Result<Option<CertificateInfo>, LookupError> {
    info!("Retrieving SSL certificate for domain: {}", host);
    let deadline = Instant::now() + timeout;

    let connector = TlsConnector::new()
        .map_err(|e| LookupError::Tls(format!("failed to create TLS connector: {}", e)))?;

    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| LookupError::Network(format!("failed to resolve {}: {}", host, e)))?
        .collect();

    let stream = connect_any(host, &addrs, deadline, timeout)?;
    let remaining = remaining(deadline, timeout)?;
    stream
        .set_read_timeout(Some(remaining))
        .and_then(|_| stream.set_write_timeout(Some(remaining)))
        .map_err(|e| LookupError::Network(format!("failed to set socket timeouts: {}", e)))?;

    debug!("Initiating TLS handshake with {}", host);
    let tls_stream = connector.connect(host, stream).map_err(|e| {
        warn!("TLS handshake failed with {}: {}", host, e);
        match e {
            HandshakeError::WouldBlock(_) => LookupError::Timeout(timeout.as_secs()),
            HandshakeError::Failure(e) => LookupError::Tls(e.to_string()),
        }
    })?;

    let cert = match tls_stream.peer_certificate() {
        Ok(Some(cert)) => cert,
        Ok(None) => {
            warn!("Verified handshake but no certificate presented by {}", host);
            return Ok(None);
        }
        Err(e) => {
            error!("Failed to get peer certificate: {}", e);
            return Err(LookupError::Tls(format!("failed to get peer certificate: {}", e)));
        }
    };

    let der = cert
        .to_der()
        .map_err(|e| LookupError::Parse(format!("failed to encode certificate: {}", e)))?;
    process_certificate_data(&der).map(Some)
}

/// Tries each resolved address in order until one accepts the connection
fn connect_any(
    host: &str,
    addrs: &[SocketAddr],
    deadline: Instant,
    timeout: StdDuration,
) -> Result<TcpStream, LookupError> {
    let mut last_error = LookupError::Network(format!("no addresses for {}", host));
    for addr in addrs {
        debug!("Establishing TCP connection to {} ({})", host, addr);
        match TcpStream::connect_timeout(addr, remaining(deadline, timeout)?) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                warn!("Failed to connect to server {} at {}: {}", host, addr, e);
                last_error = io_error(e, timeout);
            }
        }
    }
    Err(last_error)
}

fn remaining(deadline: Instant, timeout: StdDuration) -> Result<StdDuration, LookupError> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        Err(LookupError::Timeout(timeout.as_secs()))
    } else {
        Ok(left)
    }
}

fn io_error(e: std::io::Error, timeout: StdDuration) -> LookupError {
    match e.kind() {
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
            LookupError::Timeout(timeout.as_secs())
        }
        _ => LookupError::Network(e.to_string()),
    }
}

/// Extracts issuer, subject and validity period from a DER-encoded certificate
pub fn process_certificate_data(der: &[u8]) -> Result<CertificateInfo, LookupError> {
    trace!("Parsing X509 certificate from DER data");
    let (_, cert) = X509Certificate::from_der(der).map_err(|e| {
        error!("Failed to parse X509 certificate: {}", e);
        LookupError::Parse(format!("failed to parse X509 certificate: {}", e))
    })?;

    let issuer = cert.issuer().to_string();
    let subject = cert.subject().to_string();
    trace!("Certificate issuer: {}", issuer);
    trace!("Certificate subject: {}", subject);

    let valid_from = to_chrono(cert.validity().not_before.timestamp(), "not_before")?;
    let valid_to = to_chrono(cert.validity().not_after.timestamp(), "not_after")?;
    debug!("Certificate valid from {} to {}", valid_from, valid_to);

    Ok(CertificateInfo {
        issuer,
        subject,
        valid_from,
        valid_to,
    })
}

fn to_chrono(timestamp: i64, field: &str) -> Result<DateTime<Utc>, LookupError> {
    Utc.timestamp_opt(timestamp, 0).single().ok_or_else(|| {
        error!("Failed to convert {} to chrono DateTime", field);
        LookupError::Parse(format!("certificate {} out of range", field))
    })
}
