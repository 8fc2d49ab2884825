//! Device tokens and notifications.
//!
//! A [`Notification`] owns its payload as an immutable byte blob and knows how
//! to package itself into the item-encoded frame body.

use std::fmt;
use std::str::FromStr;

use bytes::{Bytes, BytesMut};

use crate::error::{ApnsError, Result};
use crate::payload::Payload;
use crate::protocol::{item_id, put_item};

/// Length of a device token in bytes.
pub const DEVICE_TOKEN_SIZE: usize = 32;

/// Binary device token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceToken(Bytes);

impl DeviceToken {
    /// Parse a hex token of [`DEVICE_TOKEN_SIZE`] bytes.
    ///
    /// Whitespace and angle brackets are ignored, so the `<a1b2 c3d4 ...>`
    /// form printed by older SDKs is accepted.
    ///
    /// # Example
    ///
    /// ```
    /// use apns_gateway::DeviceToken;
    ///
    /// let hex = "0a0b0c0d".repeat(8);
    /// let token = DeviceToken::from_hex(&format!("<{} {}>", &hex[..32], &hex[32..])).unwrap();
    /// assert_eq!(token.as_bytes().len(), 32);
    /// assert_eq!(token.to_string(), hex);
    ///
    /// assert!(DeviceToken::from_hex("0a0b0c0d").is_err());
    /// ```
    pub fn from_hex(s: &str) -> Result<Self> {
        let cleaned: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '<' && *c != '>')
            .collect();

        if cleaned.is_empty() {
            return Err(ApnsError::InvalidToken("empty token".to_string()));
        }

        let bytes = hex::decode(&cleaned)
            .map_err(|e| ApnsError::InvalidToken(format!("{}: {}", cleaned, e)))?;
        if bytes.len() != DEVICE_TOKEN_SIZE {
            return Err(ApnsError::InvalidToken(format!(
                "expected {} bytes, got {}",
                DEVICE_TOKEN_SIZE,
                bytes.len()
            )));
        }
        Ok(Self(Bytes::from(bytes)))
    }

    /// Wrap raw token bytes without checking the length.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Raw token bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for DeviceToken {
    type Err = ApnsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// Delivery priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    /// Deliver immediately.
    #[default]
    Immediate,
    /// Deliver at a time that conserves power on the device.
    PowerConserving,
}

impl Priority {
    /// Wire value of the priority item.
    pub fn as_u8(self) -> u8 {
        match self {
            Priority::Immediate => 10,
            Priority::PowerConserving => 5,
        }
    }
}

/// One notification for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    token: DeviceToken,
    payload: Bytes,
    identifier: u32,
    expiry: u32,
    priority: Priority,
}

impl Notification {
    /// Create a notification with an already-serialized payload.
    ///
    /// The identifier is random; expiry is 0 (the gateway does not store
    /// the notification if the device is offline).
    pub fn new(token: DeviceToken, payload: impl Into<Bytes>) -> Self {
        Self {
            token,
            payload: payload.into(),
            identifier: rand::random(),
            expiry: 0,
            priority: Priority::default(),
        }
    }

    /// Create a notification from a JSON payload.
    pub fn from_payload(token: DeviceToken, payload: &Payload) -> Result<Self> {
        Ok(Self::new(token, payload.to_bytes()?))
    }

    /// Set the notification identifier.
    pub fn with_identifier(mut self, identifier: u32) -> Self {
        self.identifier = identifier;
        self
    }

    /// Set the expiry (Unix seconds).
    pub fn with_expiry(mut self, expiry: u32) -> Self {
        self.expiry = expiry;
        self
    }

    /// Set the delivery priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Target device.
    pub fn token(&self) -> &DeviceToken {
        &self.token
    }

    /// Payload bytes.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Notification identifier.
    pub fn identifier(&self) -> u32 {
        self.identifier
    }

    /// Expiry in Unix seconds.
    pub fn expiry(&self) -> u32 {
        self.expiry
    }

    /// Delivery priority.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Encode the frame body: token, payload, identifier, expiry and
    /// priority items in that order.
    ///
    /// # Errors
    ///
    /// Returns [`ApnsError::PayloadTooLarge`] if the token or payload does
    /// not fit an item.
    pub fn packaged_notification(&self) -> Result<Bytes> {
        let token = self.token.as_bytes();
        let mut buf = BytesMut::with_capacity(5 * 3 + token.len() + self.payload.len() + 9);

        put_item(&mut buf, item_id::DEVICE_TOKEN, token)?;
        put_item(&mut buf, item_id::PAYLOAD, &self.payload)?;
        put_item(&mut buf, item_id::IDENTIFIER, &self.identifier.to_be_bytes())?;
        put_item(&mut buf, item_id::EXPIRATION, &self.expiry.to_be_bytes())?;
        put_item(&mut buf, item_id::PRIORITY, &[self.priority.as_u8()])?;

        Ok(buf.freeze())
    }
}
