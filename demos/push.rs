//! Push - send one notification through the gateway.
//!
//! This demo shows:
//! - Configuring the client with the builder pattern
//! - Building a payload with alert, badge and sound
//! - Reading the send report (the gateway never acknowledges)
//!
//! # Running
//!
//! ```text
//! APNS_CERT=/path/to/cert.pem APNS_TOKEN=<hex token> \
//!     cargo run --example push -- "Hello from Rust"
//! ```
//!
//! Set `APNS_PASSPHRASE` for an encrypted key and `APNS_SANDBOX=1` for the
//! development gateway. `RUST_LOG=apns_gateway=debug` shows connection steps.

use std::time::Duration;

use apns_gateway::{ApnsClient, DeviceToken, Notification, Payload};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let certificate = std::env::var("APNS_CERT")?;
    let token: DeviceToken = std::env::var("APNS_TOKEN")?.parse()?;
    let message = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Hello from apns-gateway".to_string());

    let mut builder = ApnsClient::builder()
        .certificate(certificate)
        .connect_timeout(Duration::from_secs(10))
        .io_timeout(Duration::from_secs(30));
    if let Ok(passphrase) = std::env::var("APNS_PASSPHRASE") {
        builder = builder.passphrase(passphrase);
    }
    if std::env::var("APNS_SANDBOX").is_ok() {
        builder = builder.sandbox();
    }
    let client = builder.build();

    let payload = Payload::alert(message).badge(1).sound("default");
    let notification = Notification::from_payload(token, &payload)?;

    let report = client.send_notifications(&[notification]).await?;
    tracing::info!(
        "Wrote {} notification(s), {} bytes (clean close: {})",
        report.notifications,
        report.bytes_written,
        report.clean_close
    );

    Ok(())
}
