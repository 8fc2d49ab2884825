//! Wire format encoding and decoding for notification frames.
//!
//! Each notification is sent as one frame:
//! ```text
//! ┌─────────┬──────────┬──────────────────────┐
//! │ Command │ Length   │ Body (items)         │
//! │ 1 byte  │ 4 bytes  │ Length bytes         │
//! │ 0x02    │ uint32 BE│                      │
//! └─────────┴──────────┴──────────────────────┘
//! ```
//!
//! A send is the plain concatenation of frames; the gateway consumes them in
//! stream order.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ApnsError, Result};

/// Frame header size in bytes (command + length).
pub const FRAME_HEADER_SIZE: usize = 5;

/// Command byte of the frame-based notification format.
pub const FRAME_COMMAND: u8 = 2;

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Command / protocol version marker (always 2 when produced here).
    pub command: u8,
    /// Body length in bytes.
    pub length: u32,
}

impl FrameHeader {
    /// Create a header for a body of `length` bytes.
    pub fn new(length: u32) -> Self {
        Self {
            command: FRAME_COMMAND,
            length,
        }
    }

    /// Create a header for `body`, checking that its length fits the field.
    pub fn for_body(body: &[u8]) -> Result<Self> {
        let length = u32::try_from(body.len()).map_err(|_| ApnsError::FrameTooLarge(body.len()))?;
        Ok(Self::new(length))
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use apns_gateway::protocol::FrameHeader;
    ///
    /// let bytes = FrameHeader::new(45).encode();
    /// assert_eq!(bytes, [0x02, 0x00, 0x00, 0x00, 0x2D]);
    /// ```
    pub fn encode(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut buf = [0u8; FRAME_HEADER_SIZE];
        buf[0] = self.command;
        buf[1..5].copy_from_slice(&self.length.to_be_bytes());
        buf
    }

    /// Decode header from bytes.
    ///
    /// Returns `None` if the buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < FRAME_HEADER_SIZE {
            return None;
        }
        Some(Self {
            command: buf[0],
            length: u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]),
        })
    }
}

/// Encode one packaged notification body into a frame.
///
/// # Errors
///
/// Returns [`ApnsError::FrameTooLarge`] if the body length is not
/// representable as a u32.
pub fn encode_frame(body: &[u8]) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + body.len());
    encode_frame_into(&mut buf, body)?;
    Ok(buf.freeze())
}

/// Append one frame to an existing buffer.
pub fn encode_frame_into(buf: &mut BytesMut, body: &[u8]) -> Result<()> {
    let header = FrameHeader::for_body(body)?;
    buf.reserve(FRAME_HEADER_SIZE + body.len());
    buf.put_slice(&header.encode());
    buf.put_slice(body);
    Ok(())
}

/// Encode a batch of bodies into the exact byte stream written to the gateway.
///
/// Frames appear in input order.
pub fn encode_batch<I, B>(bodies: I) -> Result<Bytes>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut buf = BytesMut::new();
    for body in bodies {
        encode_frame_into(&mut buf, body.as_ref())?;
    }
    Ok(buf.freeze())
}

/// Decode a frame header from the start of `buf` (standalone function).
#[inline]
pub fn decode_frame_header(buf: &[u8]) -> Option<FrameHeader> {
    FrameHeader::decode(buf)
}
