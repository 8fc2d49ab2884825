//! Gateway configuration.
//!
//! The well-known hosts and ports are plain constants that only seed
//! [`GatewayConfig::default`]; sessions read everything from the config they
//! are given, so tests can point them at a local endpoint.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ApnsError, Result};

/// Production gateway host.
pub const LIVE_GATEWAY: &str = "gateway.push.apple.com";

/// Sandbox (development) gateway host.
pub const SANDBOX_GATEWAY: &str = "gateway.sandbox.push.apple.com";

/// Default gateway port.
pub const GATEWAY_PORT: u16 = 2195;

/// Feedback service port, independent of the gateway port.
pub const FEEDBACK_PORT: u16 = 2196;

/// A `host:port` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// DNS name (also used for SNI and certificate validation).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Endpoint {
    /// Create a new endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Derive the feedback host from a gateway host.
///
/// Every `gateway` segment is replaced with `feedback`.
///
/// # Errors
///
/// Returns [`ApnsError::Configuration`] if the host has no `gateway`
/// segment; set an explicit feedback endpoint in that case.
///
/// # Example
///
/// ```
/// use apns_gateway::config::feedback_host;
///
/// assert_eq!(
///     feedback_host("gateway.sandbox.push.apple.com").unwrap(),
///     "feedback.sandbox.push.apple.com"
/// );
/// assert!(feedback_host("localhost").is_err());
/// ```
pub fn feedback_host(gateway_host: &str) -> Result<String> {
    if !gateway_host.contains("gateway") {
        return Err(ApnsError::Configuration(format!(
            "cannot derive feedback host from {:?}: no \"gateway\" segment",
            gateway_host
        )));
    }
    Ok(gateway_host.replace("gateway", "feedback"))
}

/// Immutable settings for gateway and feedback sessions.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Where notifications are sent.
    pub gateway: Endpoint,
    /// Explicit feedback endpoint; derived from `gateway` when `None`.
    pub feedback: Option<Endpoint>,
    /// PEM file with the client certificate and private key.
    pub certificate: Option<PathBuf>,
    /// Passphrase for an encrypted private key.
    pub passphrase: Option<String>,
    /// Extra PEM trust anchors for the server certificate.
    pub ca_certificate: Option<PathBuf>,
    /// Bound on TCP connection establishment.
    pub connect_timeout: Option<Duration>,
    /// Bound on the TLS handshake, the write, and each feedback read.
    pub io_timeout: Option<Duration>,
}

impl GatewayConfig {
    /// Endpoint of the feedback service.
    pub fn feedback_endpoint(&self) -> Result<Endpoint> {
        match &self.feedback {
            Some(endpoint) => Ok(endpoint.clone()),
            None => Ok(Endpoint::new(
                feedback_host(&self.gateway.host)?,
                FEEDBACK_PORT,
            )),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            gateway: Endpoint::new(LIVE_GATEWAY, GATEWAY_PORT),
            feedback: None,
            certificate: None,
            passphrase: None,
            ca_certificate: None,
            connect_timeout: None,
            io_timeout: None,
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("gateway", &self.gateway)
            .field("feedback", &self.feedback)
            .field("certificate", &self.certificate)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .field("ca_certificate", &self.ca_certificate)
            .field("connect_timeout", &self.connect_timeout)
            .field("io_timeout", &self.io_timeout)
            .finish()
    }
}
