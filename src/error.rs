//! Error types for mrcwire.

use thiserror::Error;

/// Framing fault found in a header. Any of these poisons the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Header does not begin with the protocol sentinel.
    #[error("Frame magic mismatch: expected 0x{expected:08x}, found 0x{found:08x}")]
    MagicMismatch { expected: u32, found: u32 },

    /// Header length fields disagree with each other.
    #[error("Frame length mismatch: length {total_length}, payload length {payload_length}")]
    LengthMismatch {
        total_length: u32,
        payload_length: u32,
    },

    /// Header announces a payload larger than the configured limit.
    #[error("Payload size {payload_length} exceeds maximum {max}")]
    PayloadTooLarge { payload_length: u64, max: u32 },
}

/// Main error type for all mrcwire operations.
#[derive(Debug, Error)]
pub enum MrcError {
    /// Malformed header in the incoming stream.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The session hit a parse error earlier and discards input until reset.
    #[error("Session is errored, input discarded until reset")]
    SessionErrored,

    /// Payload bytes don't match the layout required by their type tag.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Type tag outside the known set.
    #[error("Unknown payload type: {0}")]
    UnknownPayloadType(u32),

    /// Payload too large to describe in a 32-bit header field.
    #[error("Payload of {0} bytes does not fit the wire format")]
    PayloadOverflow(usize),

    /// I/O error while reading from the transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Consumer queue stayed full for the whole send timeout.
    #[error("Backpressure timeout")]
    Backpressure,

    /// The other half of a frame channel was dropped.
    #[error("Channel disconnected")]
    Disconnected,
}

impl MrcError {
    /// Whether this error is a framing fault that poisons the session.
    #[inline]
    pub fn is_parse_error(&self) -> bool {
        matches!(self, MrcError::Frame(_))
    }

    /// The framing fault, if this is one.
    pub fn frame_error(&self) -> Option<FrameError> {
        match self {
            MrcError::Frame(err) => Some(*err),
            _ => None,
        }
    }
}

/// Result type alias using MrcError.
pub type Result<T> = std::result::Result<T, MrcError>;
