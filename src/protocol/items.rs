//! Item encoding of a frame body.
//!
//! A frame body is a sequence of items:
//! ```text
//! ┌─────────┬───────────┬─────────────┐
//! │ Item ID │ Length    │ Data        │
//! │ 1 byte  │ uint16 BE │ Length bytes│
//! └─────────┴───────────┴─────────────┘
//! ```

use bytes::{BufMut, BytesMut};

use crate::error::{ApnsError, Result};

/// Item header size in bytes (id + length).
pub const ITEM_HEADER_SIZE: usize = 3;

/// Item identifiers.
pub mod item_id {
    /// Binary device token.
    pub const DEVICE_TOKEN: u8 = 1;
    /// JSON payload.
    pub const PAYLOAD: u8 = 2;
    /// Opaque 4-byte notification identifier.
    pub const IDENTIFIER: u8 = 3;
    /// Expiration date, uint32 BE Unix seconds.
    pub const EXPIRATION: u8 = 4;
    /// Delivery priority, one byte.
    pub const PRIORITY: u8 = 5;
}

/// Append one item to `buf`.
///
/// # Errors
///
/// Returns [`ApnsError::PayloadTooLarge`] if `data` does not fit the u16
/// length field.
pub fn put_item(buf: &mut BytesMut, id: u8, data: &[u8]) -> Result<()> {
    let length = u16::try_from(data.len()).map_err(|_| ApnsError::PayloadTooLarge(data.len()))?;
    buf.reserve(ITEM_HEADER_SIZE + data.len());
    buf.put_u8(id);
    buf.put_u16(length);
    buf.put_slice(data);
    Ok(())
}

/// Split a frame body into `(id, data)` items.
///
/// Returns `None` if the last item is truncated.
pub fn parse_items(mut body: &[u8]) -> Option<Vec<(u8, &[u8])>> {
    let mut items = Vec::new();
    while !body.is_empty() {
        if body.len() < ITEM_HEADER_SIZE {
            return None;
        }
        let id = body[0];
        let length = u16::from_be_bytes([body[1], body[2]]) as usize;
        let end = ITEM_HEADER_SIZE + length;
        if body.len() < end {
            return None;
        }
        items.push((id, &body[ITEM_HEADER_SIZE..end]));
        body = &body[end..];
    }
    Some(items)
}
