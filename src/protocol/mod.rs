//! Protocol module - frame codec and feedback records.
//!
//! Pure encode/decode with no I/O:
//! - 5-byte frame header and batch encoding for the gateway
//! - item encoding of a frame body
//! - fixed-layout feedback records and a buffer for partial reads

mod feedback;
mod items;
mod wire_format;

pub use feedback::{
    decode_feedback_record, FeedbackBuffer, FeedbackRecord, FEEDBACK_RECORD_SIZE,
    FEEDBACK_TOKEN_SIZE, RECORD_HEADER_SIZE,
};
pub use items::{item_id, parse_items, put_item, ITEM_HEADER_SIZE};
pub use wire_format::{
    decode_frame_header, encode_batch, encode_frame, encode_frame_into, FrameHeader,
    FRAME_COMMAND, FRAME_HEADER_SIZE,
};
