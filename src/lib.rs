//! # apns-gateway
//!
//! Rust client for the Apple Push Notification service binary gateway.
//!
//! Notifications are packaged into length-prefixed frames and written over a
//! mutually authenticated TLS connection. The companion feedback service
//! streams back the device tokens that no longer accept notifications.
//!
//! ## Architecture
//!
//! - **Protocol** ([`protocol`]): pure frame and feedback record codec
//! - **Session** ([`session`]): one TLS connection, one operation, then close
//! - **Client** ([`ApnsClient`]): builder-configured entry point that opens a
//!   fresh session per call
//!
//! ## Example
//!
//! ```ignore
//! use apns_gateway::{ApnsClient, DeviceToken, Notification, Payload, Priority};
//!
//! #[tokio::main]
//! async fn main() -> apns_gateway::Result<()> {
//!     let client = ApnsClient::builder()
//!         .certificate("/etc/apns/cert.pem")
//!         .sandbox()
//!         .build();
//!
//!     let token: DeviceToken = "<a1b2c3d4 ...>".parse()?;
//!     let payload = Payload::alert("Build finished").badge(1).sound("default");
//!     let notification = Notification::from_payload(token, &payload)?
//!         .with_priority(Priority::PowerConserving);
//!
//!     let report = client.send_notifications(&[notification]).await?;
//!     println!("wrote {} bytes", report.bytes_written);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod credentials;
pub mod error;
pub mod notification;
pub mod payload;
pub mod protocol;
pub mod session;
pub mod transport;

mod client;

pub use client::{ApnsClient, ApnsClientBuilder};
pub use config::{Endpoint, GatewayConfig};
pub use error::{ApnsError, Result};
pub use notification::{DeviceToken, Notification, Priority, DEVICE_TOKEN_SIZE};
pub use payload::Payload;
pub use protocol::FeedbackRecord;
pub use session::{GatewaySession, SendReport, SessionState};
