//! Feedback - list device tokens the gateway reports as gone.
//!
//! # Running
//!
//! ```text
//! APNS_CERT=/path/to/cert.pem APNS_SANDBOX=1 cargo run --example feedback
//! ```
//!
//! Feedback is drained on read: a second run only shows tokens reported
//! since the first.

use std::time::Duration;

use apns_gateway::ApnsClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut builder = ApnsClient::builder()
        .certificate(std::env::var("APNS_CERT")?)
        .io_timeout(Duration::from_secs(30));
    if let Ok(passphrase) = std::env::var("APNS_PASSPHRASE") {
        builder = builder.passphrase(passphrase);
    }
    if std::env::var("APNS_SANDBOX").is_ok() {
        builder = builder.sandbox();
    }
    let client = builder.build();

    let records = client.fetch_feedback().await?;
    tracing::info!("{} token(s) reported", records.len());

    for record in &records {
        println!("{}  {}", record.time().to_rfc3339(), record.token_hex());
    }

    Ok(())
}
