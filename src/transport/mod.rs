//! Transport module - TCP connection and TLS handshake.
//!
//! Provides:
//! - TCP connect with an optional timeout
//! - rustls client configuration presenting the provider certificate
//! - a deadline wrapper for handshake, write and read steps

mod tls;

pub use tls::{client_config, connect_tcp, handshake, with_deadline, GatewayStream};
