//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the binary capture-stream protocol:
//! - 16-byte little-endian header encoding/decoding
//! - Frame buffer for accumulating partial reads
//! - Frame struct with typed accessors

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::{build_frame, build_frame_parts, try_build_frame, Frame};
pub use frame_buffer::{FrameBuffer, DEFAULT_SCRATCH_CAPACITY};
pub use wire_format::{
    decode_header, encode_header, peek_magic, Header, PayloadType, DEFAULT_MAX_PAYLOAD_LEN,
    HEADER_SIZE, MAGIC, MAGIC_SIZE,
};
