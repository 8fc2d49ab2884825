//! Feedback service records.
//!
//! The feedback service streams fixed-layout records and then closes:
//! ```text
//! ┌───────────┬──────────────┬──────────────────────┐
//! │ Timestamp │ Token length │ Device token         │
//! │ uint32 BE │ uint16 BE    │ token length bytes   │
//! └───────────┴──────────────┴──────────────────────┘
//! ```
//!
//! The token length is 32 in practice, giving 38-byte records, but the
//! decoder honours whatever length the record declares.

use bytes::{Buf, Bytes, BytesMut};
use chrono::{DateTime, Utc};

use crate::error::{ApnsError, Result};

/// Size of the timestamp + token length prefix.
pub const RECORD_HEADER_SIZE: usize = 6;

/// Token length the feedback service uses.
pub const FEEDBACK_TOKEN_SIZE: usize = 32;

/// Size of a record carrying a standard 32-byte token.
pub const FEEDBACK_RECORD_SIZE: usize = RECORD_HEADER_SIZE + FEEDBACK_TOKEN_SIZE;

/// A device token the gateway reported as no longer valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackRecord {
    /// Unix time (seconds) at which the gateway determined the app was gone.
    pub timestamp: u32,
    /// Raw device token bytes.
    pub token: Bytes,
}

impl FeedbackRecord {
    /// Timestamp as a UTC date.
    pub fn time(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(i64::from(self.timestamp), 0).unwrap_or_default()
    }

    /// Device token as lowercase hex, the form used when sending.
    pub fn token_hex(&self) -> String {
        hex::encode(&self.token)
    }
}

/// Decode one record from the start of `buf`.
///
/// Returns the record and the number of bytes it occupied so a caller can
/// advance its cursor.
///
/// # Errors
///
/// Returns [`ApnsError::MalformedRecord`] if `buf` holds fewer bytes than the
/// record declares.
///
/// # Example
///
/// ```
/// use apns_gateway::protocol::decode_feedback_record;
///
/// let mut buf = 1_609_459_200u32.to_be_bytes().to_vec();
/// buf.extend_from_slice(&32u16.to_be_bytes());
/// buf.extend_from_slice(&[0u8; 32]);
///
/// let (record, consumed) = decode_feedback_record(&buf).unwrap();
/// assert_eq!(consumed, 38);
/// assert_eq!(record.time().to_rfc3339(), "2021-01-01T00:00:00+00:00");
/// assert_eq!(record.token_hex(), "00".repeat(32));
/// ```
pub fn decode_feedback_record(buf: &[u8]) -> Result<(FeedbackRecord, usize)> {
    if buf.len() < RECORD_HEADER_SIZE {
        return Err(ApnsError::MalformedRecord {
            needed: RECORD_HEADER_SIZE,
            available: buf.len(),
        });
    }

    let timestamp = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let token_length = u16::from_be_bytes([buf[4], buf[5]]) as usize;
    let consumed = RECORD_HEADER_SIZE + token_length;

    if buf.len() < consumed {
        return Err(ApnsError::MalformedRecord {
            needed: consumed,
            available: buf.len(),
        });
    }

    let record = FeedbackRecord {
        timestamp,
        token: Bytes::copy_from_slice(&buf[RECORD_HEADER_SIZE..consumed]),
    };
    Ok((record, consumed))
}

/// Accumulates feedback bytes across reads and yields complete records.
///
/// A record may arrive split over several TCP segments; the partial tail
/// stays buffered until the rest arrives.
#[derive(Debug)]
pub struct FeedbackBuffer {
    buffer: BytesMut,
}

impl FeedbackBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// Push data into the buffer and extract all complete records.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<FeedbackRecord>> {
        self.buffer.extend_from_slice(data);

        let mut records = Vec::new();
        while self.has_complete_record() {
            let (record, consumed) = decode_feedback_record(&self.buffer)?;
            self.buffer.advance(consumed);
            records.push(record);
        }

        Ok(records)
    }

    fn has_complete_record(&self) -> bool {
        if self.buffer.len() < RECORD_HEADER_SIZE {
            return false;
        }
        let token_length = u16::from_be_bytes([self.buffer[4], self.buffer[5]]) as usize;
        self.buffer.len() >= RECORD_HEADER_SIZE + token_length
    }

    /// Number of buffered bytes not yet forming a complete record.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop any buffered partial record.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FeedbackBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record_bytes(timestamp: u32, token: &[u8]) -> Vec<u8> {
        let mut bytes = timestamp.to_be_bytes().to_vec();
        bytes.extend_from_slice(&(token.len() as u16).to_be_bytes());
        bytes.extend_from_slice(token);
        bytes
    }

    #[test]
    fn test_decode_standard_record() {
        let token: Vec<u8> = (0..32).collect();
        let bytes = make_record_bytes(1_700_000_000, &token);
        assert_eq!(bytes.len(), FEEDBACK_RECORD_SIZE);

        let (record, consumed) = decode_feedback_record(&bytes).unwrap();

        assert_eq!(consumed, FEEDBACK_RECORD_SIZE);
        assert_eq!(record.timestamp, 1_700_000_000);
        assert_eq!(&record.token[..], &token[..]);
        assert_eq!(record.token.len(), FEEDBACK_TOKEN_SIZE);
    }

    #[test]
    fn test_decode_new_year_zero_token() {
        let bytes = make_record_bytes(1_609_459_200, &[0u8; 32]);
        let (record, _) = decode_feedback_record(&bytes).unwrap();

        assert_eq!(record.time().to_rfc3339(), "2021-01-01T00:00:00+00:00");
        assert_eq!(record.token_hex(), "00".repeat(32));
    }

    #[test]
    fn test_decode_short_buffer_is_malformed() {
        let bytes = make_record_bytes(1, &[0xAB; 32]);

        let result = decode_feedback_record(&bytes[..37]);
        assert!(matches!(
            result,
            Err(ApnsError::MalformedRecord {
                needed: 38,
                available: 37
            })
        ));

        let result = decode_feedback_record(&bytes[..3]);
        assert!(matches!(
            result,
            Err(ApnsError::MalformedRecord {
                needed: RECORD_HEADER_SIZE,
                available: 3
            })
        ));
    }

    #[test]
    fn test_decode_non_standard_token_length() {
        let bytes = make_record_bytes(7, &[0x11; 8]);
        let (record, consumed) = decode_feedback_record(&bytes).unwrap();

        assert_eq!(consumed, RECORD_HEADER_SIZE + 8);
        assert_eq!(record.token.len(), 8);
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut bytes = make_record_bytes(7, &[0x22; 32]);
        bytes.extend_from_slice(&[0xFF; 10]);

        let (_, consumed) = decode_feedback_record(&bytes).unwrap();
        assert_eq!(consumed, FEEDBACK_RECORD_SIZE);
    }

    #[test]
    fn test_buffer_two_records_and_tail() {
        let mut buffer = FeedbackBuffer::new();
        let mut data = make_record_bytes(1, &[0x01; 32]);
        data.extend(make_record_bytes(2, &[0x02; 32]));
        data.extend_from_slice(&[9, 9, 9, 9, 9]);

        let records = buffer.push(&data).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].timestamp, 1);
        assert_eq!(records[1].timestamp, 2);
        assert_eq!(buffer.len(), 5);
    }

    #[test]
    fn test_buffer_record_split_across_pushes() {
        let mut buffer = FeedbackBuffer::new();
        let bytes = make_record_bytes(42, &[0xCD; 32]);

        assert!(buffer.push(&bytes[..4]).unwrap().is_empty());
        assert!(buffer.push(&bytes[4..20]).unwrap().is_empty());

        let records = buffer.push(&bytes[20..]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp, 42);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_buffer_byte_at_a_time() {
        let mut buffer = FeedbackBuffer::new();
        let mut data = make_record_bytes(10, &[0xA0; 32]);
        data.extend(make_record_bytes(11, &[0xB0; 32]));

        let mut all = Vec::new();
        for byte in &data {
            all.extend(buffer.push(&[*byte]).unwrap());
        }

        assert_eq!(all.len(), 2);
        assert_eq!(all[1].token_hex(), "b0".repeat(32));
    }

    #[test]
    fn test_clear_drops_tail() {
        let mut buffer = FeedbackBuffer::new();
        buffer.push(&[1, 2, 3]).unwrap();
        assert_eq!(buffer.len(), 3);

        buffer.clear();
        assert!(buffer.is_empty());
    }
}
