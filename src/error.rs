//! Error types for apns-gateway.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for all gateway operations.
///
/// Every variant aborts the current operation. When a connection was open it
/// has already been closed by the time the error reaches the caller.
#[derive(Debug, Error)]
pub enum ApnsError {
    /// Missing or inconsistent configuration (e.g. credential path not set).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The configured credential file does not exist.
    #[error("Credential file not found: {}", .0.display())]
    CredentialNotFound(PathBuf),

    /// Certificate or private key material could not be parsed.
    #[error("Credential parse error: {0}")]
    CredentialParse(String),

    /// TCP connect, DNS resolution, or connect timeout failure.
    #[error("Connection to {endpoint} failed: {reason}")]
    Connection {
        /// `host:port` that was being dialed.
        endpoint: String,
        /// Human readable cause.
        reason: String,
    },

    /// TLS handshake or certificate validation failure.
    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),

    /// Feedback buffer shorter than the record it declares.
    #[error("Malformed feedback record: need {needed} bytes, have {available}")]
    MalformedRecord {
        /// Bytes the record needs.
        needed: usize,
        /// Bytes that were available.
        available: usize,
    },

    /// Frame body does not fit the 4-byte length field.
    #[error("Frame body of {0} bytes exceeds the u32 length field")]
    FrameTooLarge(usize),

    /// Item data does not fit the 2-byte item length field.
    #[error("Item of {0} bytes exceeds the u16 length field")]
    PayloadTooLarge(usize),

    /// Device token is not valid hex or is not 32 bytes long.
    #[error("Invalid device token: {0}")]
    InvalidToken(String),

    /// The configured I/O deadline elapsed.
    #[error("Deadline elapsed during {0}")]
    DeadlineElapsed(&'static str),

    /// The session already ran its operation.
    #[error("Session closed")]
    SessionClosed,

    /// I/O error on an open connection (write or read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error (notification payload).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using ApnsError.
pub type Result<T> = std::result::Result<T, ApnsError>;
