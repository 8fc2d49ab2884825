//! JSON notification payload.
//!
//! Builds the `{"aps": {...}, ...custom}` document the device receives.
//!
//! # Example
//!
//! ```
//! use apns_gateway::Payload;
//!
//! let payload = Payload::alert("Hello").badge(3).sound("default");
//! let json = payload.to_bytes().unwrap();
//! assert_eq!(&json[..], br#"{"aps":{"alert":"Hello","badge":3,"sound":"default"}}"#);
//! ```

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;

/// The `aps` dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aps {
    /// Alert text shown to the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<String>,
    /// Badge number on the app icon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<u32>,
    /// Sound file name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    /// `1` for a silent background update.
    #[serde(rename = "content-available", skip_serializing_if = "Option::is_none")]
    pub content_available: Option<u8>,
}

/// A complete notification payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Payload {
    /// Apple-defined keys.
    pub aps: Aps,
    /// App-defined top-level keys.
    #[serde(flatten)]
    pub custom: Map<String, Value>,
}

impl Payload {
    /// Create an empty payload (`{"aps":{}}`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a payload carrying an alert.
    pub fn alert(text: impl Into<String>) -> Self {
        let mut payload = Self::new();
        payload.aps.alert = Some(text.into());
        payload
    }

    /// Set the badge number.
    pub fn badge(mut self, badge: u32) -> Self {
        self.aps.badge = Some(badge);
        self
    }

    /// Set the sound name.
    pub fn sound(mut self, sound: impl Into<String>) -> Self {
        self.aps.sound = Some(sound.into());
        self
    }

    /// Mark as a background (content-available) notification.
    pub fn content_available(mut self) -> Self {
        self.aps.content_available = Some(1);
        self
    }

    /// Add an app-defined top-level key.
    ///
    /// The `aps` key is reserved and ignored here.
    pub fn custom(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key == "aps" {
            tracing::warn!("Ignoring custom payload key \"aps\"");
            return self;
        }
        self.custom.insert(key, value.into());
        self
    }

    /// Serialize to the JSON bytes sent on the wire.
    pub fn to_bytes(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }
}

impl From<&str> for Payload {
    fn from(alert: &str) -> Self {
        Self::alert(alert)
    }
}

impl From<String> for Payload {
    fn from(alert: String) -> Self {
        Self::alert(alert)
    }
}
