//! TCP + TLS connection setup with a client certificate.
//!
//! Server certificates are verified against the public WebPKI roots plus
//! any configured extra trust anchors. The client certificate is always
//! presented; the gateway rejects the handshake without it.

use std::future::Future;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use crate::config::Endpoint;
use crate::credentials::Credentials;
use crate::error::{ApnsError, Result};

/// An established TLS connection to the gateway or feedback service.
pub type GatewayStream = TlsStream<TcpStream>;

/// Build the rustls client configuration for one connection attempt.
pub fn client_config(
    credentials: Credentials,
    ca_certificate: Option<&Path>,
) -> Result<Arc<ClientConfig>> {
    let mut root_store = RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    if let Some(ca_path) = ca_certificate {
        add_trust_anchors(&mut root_store, ca_path)?;
    }

    let (cert_chain, key) = credentials.into_parts();
    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_client_auth_cert(cert_chain, key)
        .map_err(|e| ApnsError::CredentialParse(format!("unusable client certificate: {}", e)))?;

    Ok(Arc::new(config))
}

fn add_trust_anchors(root_store: &mut RootCertStore, ca_path: &Path) -> Result<()> {
    let pem = std::fs::read(ca_path).map_err(|e| {
        ApnsError::Configuration(format!(
            "failed to read CA certificate {}: {}",
            ca_path.display(),
            e
        ))
    })?;

    let mut reader = BufReader::new(pem.as_slice());
    let mut added = 0;
    for cert in rustls_pemfile::certs(&mut reader) {
        let cert = cert.map_err(|e| {
            ApnsError::Configuration(format!("invalid CA certificate PEM: {}", e))
        })?;
        root_store.add(cert).map_err(|e| {
            ApnsError::Configuration(format!("failed to add CA certificate: {}", e))
        })?;
        added += 1;
    }

    if added == 0 {
        return Err(ApnsError::Configuration(format!(
            "no CA certificates found in {}",
            ca_path.display()
        )));
    }
    Ok(())
}

/// Open the TCP connection, bounded by `timeout` if set.
pub async fn connect_tcp(endpoint: &Endpoint, timeout: Option<Duration>) -> Result<TcpStream> {
    let connect = TcpStream::connect((endpoint.host.as_str(), endpoint.port));

    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, connect)
            .await
            .map_err(|_| ApnsError::Connection {
                endpoint: endpoint.to_string(),
                reason: format!("timed out after {:?}", limit),
            })?,
        None => connect.await,
    };

    let stream = result.map_err(|e| ApnsError::Connection {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;

    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!("Failed to set TCP_NODELAY: {}", e);
    }
    Ok(stream)
}

/// Run the TLS handshake over an open TCP connection.
pub async fn handshake(
    tcp: TcpStream,
    endpoint: &Endpoint,
    config: Arc<ClientConfig>,
    deadline: Option<Duration>,
) -> Result<GatewayStream> {
    let server_name = ServerName::try_from(endpoint.host.clone()).map_err(|e| {
        ApnsError::Configuration(format!("invalid TLS server name {:?}: {}", endpoint.host, e))
    })?;

    let connector = TlsConnector::from(config);
    with_deadline(deadline, "TLS handshake", connector.connect(server_name, tcp))
        .await?
        .map_err(|e| ApnsError::TlsHandshake(e.to_string()))
}

/// Await `fut`, failing with [`ApnsError::DeadlineElapsed`] after `deadline`.
///
/// `None` waits indefinitely.
pub async fn with_deadline<F, T>(
    deadline: Option<Duration>,
    operation: &'static str,
    fut: F,
) -> Result<T>
where
    F: Future<Output = T>,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| ApnsError::DeadlineElapsed(operation)),
        None => Ok(fut.await),
    }
}
