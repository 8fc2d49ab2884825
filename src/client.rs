//! Client builder and call surface.
//!
//! The [`ApnsClientBuilder`] provides a fluent API for configuring the
//! target and credentials. The [`ApnsClient`] runs each operation on a fresh
//! [`GatewaySession`]:
//! 1. Load credentials from disk
//! 2. Connect and negotiate TLS with the client certificate
//! 3. Write notifications or read feedback
//! 4. Close the connection
//!
//! # Example
//!
//! ```no_run
//! use apns_gateway::ApnsClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApnsClient::builder()
//!         .certificate("/etc/apns/cert.pem")
//!         .passphrase("secret")
//!         .sandbox()
//!         .build();
//!
//!     client
//!         .send_notification(
//!             "a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f90",
//!             "Hello from the gateway",
//!         )
//!         .await?;
//!
//!     for record in client.fetch_feedback().await? {
//!         println!("{} gone since {}", record.token_hex(), record.time());
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Endpoint, GatewayConfig, LIVE_GATEWAY, SANDBOX_GATEWAY};
use crate::error::Result;
use crate::notification::{DeviceToken, Notification};
use crate::payload::Payload;
use crate::protocol::FeedbackRecord;
use crate::session::{GatewaySession, SendReport};

/// Builder for configuring and creating an [`ApnsClient`].
///
/// Nothing is validated here; a missing or unreadable certificate is
/// reported by the first operation.
#[derive(Debug, Default)]
pub struct ApnsClientBuilder {
    config: GatewayConfig,
}

impl ApnsClientBuilder {
    /// Create a builder targeting the production gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// PEM file holding the client certificate and private key.
    pub fn certificate(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.certificate = Some(path.into());
        self
    }

    /// Passphrase for an encrypted private key.
    pub fn passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.config.passphrase = Some(passphrase.into());
        self
    }

    /// Gateway host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.gateway.host = host.into();
        self
    }

    /// Gateway port.
    ///
    /// Default: 2195
    pub fn port(mut self, port: u16) -> Self {
        self.config.gateway.port = port;
        self
    }

    /// Target the production gateway.
    pub fn production(self) -> Self {
        self.host(LIVE_GATEWAY)
    }

    /// Target the sandbox gateway.
    pub fn sandbox(self) -> Self {
        self.host(SANDBOX_GATEWAY)
    }

    /// Bound TCP connection establishment.
    ///
    /// Default: none
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Bound the TLS handshake, the write, and each feedback read.
    ///
    /// Default: none
    pub fn io_timeout(mut self, timeout: Duration) -> Self {
        self.config.io_timeout = Some(timeout);
        self
    }

    /// Trust an extra CA (PEM) for the server certificate.
    pub fn ca_certificate(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ca_certificate = Some(path.into());
        self
    }

    /// Use an explicit feedback endpoint instead of deriving it from the
    /// gateway host.
    pub fn feedback_endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.feedback = Some(Endpoint::new(host, port));
        self
    }

    /// Build the client.
    pub fn build(self) -> ApnsClient {
        ApnsClient::new(self.config)
    }
}

/// Caller-facing client.
///
/// Cheap to clone. Every call opens its own connection; concurrent calls do
/// not share state.
#[derive(Debug, Clone)]
pub struct ApnsClient {
    config: Arc<GatewayConfig>,
}

impl ApnsClient {
    /// Create a client from a complete configuration.
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Create a new client builder.
    pub fn builder() -> ApnsClientBuilder {
        ApnsClientBuilder::new()
    }

    /// The configuration every session uses.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// A fresh, unconnected session.
    pub fn session(&self) -> GatewaySession {
        GatewaySession::new(Arc::clone(&self.config))
    }

    /// Send one notification.
    ///
    /// `token` is the hex device token; `message` is an alert string or a
    /// full [`Payload`].
    pub async fn send_notification(
        &self,
        token: &str,
        message: impl Into<Payload>,
    ) -> Result<SendReport> {
        let token = DeviceToken::from_hex(token)?;
        let notification = Notification::from_payload(token, &message.into())?;
        self.send_notifications(&[notification]).await
    }

    /// Send a batch of notifications over one connection.
    pub async fn send_notifications(&self, notifications: &[Notification]) -> Result<SendReport> {
        self.session().send_notifications(notifications).await
    }

    /// Fetch the tokens the gateway reports as no longer valid.
    pub async fn fetch_feedback(&self) -> Result<Vec<FeedbackRecord>> {
        self.session().fetch_feedback().await
    }
}
