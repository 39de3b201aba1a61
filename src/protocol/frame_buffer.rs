//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` as the scratch pad. Consumed frames are evicted
//! from the front, so the pre-sized allocation is reused rather than grown.
//! Implements a state machine for handling fragmented frames:
//! - `WaitingForHeader`: Need at least 16 bytes
//! - `WaitingForPayload`: Header checked, need the rest of the frame
//!
//! The buffer itself is not synchronized and holds no session state: a
//! parse error is returned to the caller, which decides whether to keep
//! feeding it. [`StreamFramer`](crate::StreamFramer) makes that error sticky.
//!
//! # Example
//!
//! ```
//! use mrcwire::protocol::{build_frame, FrameBuffer, PayloadType};
//!
//! let mut buffer = FrameBuffer::new();
//! let bytes = build_frame(PayloadType::VideoData, b"access unit");
//!
//! // Data arrives in chunks from the transport
//! assert!(buffer.push(&bytes[..10]).unwrap().is_empty());
//! let frames = buffer.push(&bytes[10..]).unwrap();
//!
//! assert_eq!(frames[0].payload(), b"access unit");
//! ```

use bytes::{Buf, Bytes, BytesMut};
use tracing::warn;

use super::wire_format::{peek_magic, Header, HEADER_SIZE, MAGIC};
use super::Frame;
use crate::config::FramerConfig;
use crate::error::FrameError;

/// Default scratch capacity (16 MiB), sized for sustained high-bitrate video.
pub const DEFAULT_SCRATCH_CAPACITY: usize = 16 * 1024 * 1024;

/// State machine for frame parsing.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for complete header (need 16 bytes).
    WaitingForHeader,
    /// Magic checked, waiting for the whole frame to be buffered.
    WaitingForPayload { header: Header, frame_len: usize },
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
pub struct FrameBuffer {
    /// Bytes received but not yet resolved into frames.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed payload size.
    max_payload_len: u32,
    /// Peek at the following magic after each frame.
    check_next_magic: bool,
    /// Frames whose successor did not start with the magic.
    suspect_boundaries: u64,
}

impl FrameBuffer {
    /// Create a new frame buffer with default settings.
    ///
    /// Default capacity: 16 MiB, no payload limit, next-magic check enabled.
    pub fn new() -> Self {
        Self::with_config(&FramerConfig::default())
    }

    /// Create a new frame buffer with custom scratch capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(&FramerConfig::default().with_scratch_capacity(capacity))
    }

    /// Create a new frame buffer from a framer configuration.
    pub fn with_config(config: &FramerConfig) -> Self {
        Self {
            buffer: BytesMut::with_capacity(config.scratch_capacity),
            state: State::WaitingForHeader,
            max_payload_len: config.max_payload_len,
            check_next_magic: config.check_next_magic,
            suspect_boundaries: 0,
        }
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// Partial data is buffered internally for the next push.
    ///
    /// # Errors
    ///
    /// Returns the first parse error. Frames completed earlier in the same
    /// call are dropped along with it; callers that need them should use
    /// [`extend`](Self::extend) and [`try_extract_one`](Self::try_extract_one).
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>, FrameError> {
        self.extend(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }

        Ok(frames)
    }

    /// Append data to the buffer without extracting frames.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to extract a single frame from the front of the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(frame))` if a complete frame was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` on a protocol violation; the offending bytes stay buffered
    pub fn try_extract_one(&mut self) -> Result<Option<Frame>, FrameError> {
        match self.state {
            State::WaitingForHeader => {
                // Peek, don't consume yet
                let header = match Header::decode(&self.buffer) {
                    Some(header) => header,
                    None => return Ok(None),
                };

                if let Err(err) = header.validate_magic() {
                    warn!(
                        "Frame magic mismatch: expected 0x{:08x} got 0x{:08x}",
                        MAGIC, header.magic
                    );
                    return Err(err);
                }

                let frame_len = self.checked_frame_len(&header)?;
                self.state = State::WaitingForPayload { header, frame_len };

                self.try_extract_one()
            }

            State::WaitingForPayload { header, frame_len } => {
                if self.buffer.len() < frame_len {
                    return Ok(None);
                }

                if let Err(err) = header.validate_lengths() {
                    warn!(
                        "Frame length mismatch: length {}, payload length {}",
                        header.total_length_excluding_magic, header.payload_length
                    );
                    return Err(err);
                }

                if self.check_next_magic {
                    self.check_successor(&header, frame_len);
                }

                // Copy out so the scratch allocation stays uniquely owned
                let payload = Bytes::copy_from_slice(&self.buffer[HEADER_SIZE..frame_len]);
                self.buffer.advance(frame_len);
                self.state = State::WaitingForHeader;

                Ok(Some(Frame::new(header.payload_type(), payload)))
            }
        }
    }

    /// Frame length in bytes, rejecting headers over the payload limit.
    ///
    /// The limit applies to the payload size implied by the total length.
    fn checked_frame_len(&self, header: &Header) -> Result<usize, FrameError> {
        let implied = header.frame_len().saturating_sub(HEADER_SIZE as u64);
        let too_large = FrameError::PayloadTooLarge {
            payload_length: implied,
            max: self.max_payload_len,
        };

        if implied > u64::from(self.max_payload_len) {
            warn!(
                "Payload size {} exceeds maximum {}",
                implied, self.max_payload_len
            );
            return Err(too_large);
        }

        usize::try_from(header.frame_len()).map_err(|_| too_large)
    }

    /// Advisory check that the next frame starts where this one ends.
    fn check_successor(&mut self, header: &Header, frame_len: usize) {
        if let Some(next_magic) = peek_magic(&self.buffer, frame_len) {
            if next_magic != MAGIC {
                self.suspect_boundaries += 1;
                warn!(
                    "Will have magic number error in next frame: current frame type {}, frame length {}, buffered {}",
                    header.payload_type,
                    frame_len,
                    self.buffer.len()
                );
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Current scratch capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Number of frames followed by bytes that did not start with the magic.
    pub fn suspect_boundaries(&self) -> u64 {
        self.suspect_boundaries
    }

    /// Clear the buffer and reset state. Capacity is kept.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForHeader;
        self.suspect_boundaries = 0;
    }

    /// Get the current state for debugging.
    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.state {
            State::WaitingForHeader => "WaitingForHeader",
            State::WaitingForPayload { .. } => "WaitingForPayload",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("buffered", &self.buffer.len())
            .field("state", &self.state)
            .field("max_payload_len", &self.max_payload_len)
            .finish()
    }
}
