//! Frame struct with typed accessors.
//!
//! Represents one complete capture frame: a payload type tag and the payload
//! bytes that followed the header. Uses `bytes::Bytes` so a frame can be
//! handed to decoder threads without copying again.
//!
//! # Example
//!
//! ```
//! use mrcwire::protocol::{Frame, PayloadType};
//! use bytes::Bytes;
//!
//! let frame = Frame::new(PayloadType::VideoData, Bytes::from_static(b"nal"));
//!
//! assert!(frame.is_video());
//! assert_eq!(frame.payload(), b"nal");
//! ```

use bytes::Bytes;

use super::wire_format::{Header, PayloadType, HEADER_SIZE};
use crate::error::Result;

/// A complete capture frame.
///
/// The payload never aliases the framer's scratch buffer; once popped the
/// caller is its only owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Decoded payload type tag.
    pub payload_type: PayloadType,
    /// Payload bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame from a type tag and payload.
    pub fn new(payload_type: PayloadType, payload: Bytes) -> Self {
        Self {
            payload_type,
            payload,
        }
    }

    /// Create a frame from a type tag and raw bytes (copies data).
    pub fn from_parts(payload_type: PayloadType, payload: &[u8]) -> Self {
        Self {
            payload_type,
            payload: Bytes::copy_from_slice(payload),
        }
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get a clone of the payload as Bytes (cheap, zero-copy).
    #[inline]
    pub fn payload_bytes(&self) -> Bytes {
        self.payload.clone()
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Consume the frame and return its payload.
    #[inline]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Check if this frame belongs to the video stream.
    #[inline]
    pub fn is_video(&self) -> bool {
        self.payload_type.is_video()
    }

    /// Check if this frame belongs to the audio stream.
    #[inline]
    pub fn is_audio(&self) -> bool {
        self.payload_type.is_audio()
    }

    /// Header that would introduce this frame on the wire.
    ///
    /// Fails with `PayloadOverflow` if the payload is too large to frame.
    #[inline]
    pub fn header(&self) -> Result<Header> {
        Header::try_for_payload(self.payload_type, self.payload.len())
    }

    /// Encode this frame back to wire bytes.
    ///
    /// # Panics
    ///
    /// Same limit as [`build_frame`].
    pub fn to_bytes(&self) -> Vec<u8> {
        build_frame(self.payload_type, &self.payload)
    }
}

/// Build a complete frame as a single byte vector.
///
/// Encodes a consistent header and appends payload into a contiguous buffer.
/// Use `build_frame_parts` for scatter/gather I/O (writev).
///
/// # Errors
///
/// `PayloadOverflow` if the payload is longer than
/// [`DEFAULT_MAX_PAYLOAD_LEN`](super::DEFAULT_MAX_PAYLOAD_LEN).
pub fn try_build_frame(payload_type: PayloadType, payload: &[u8]) -> Result<Vec<u8>> {
    let header = Header::try_for_payload(payload_type, payload.len())?;
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Infallible form of [`try_build_frame`] for payloads known to fit.
///
/// # Example
///
/// ```
/// use mrcwire::protocol::{build_frame, PayloadType};
///
/// let bytes = build_frame(PayloadType::AudioSampleRate, &48_000u32.to_le_bytes());
/// assert_eq!(bytes.len(), 16 + 4); // header + payload
/// ```
///
/// # Panics
///
/// If the payload is longer than
/// [`DEFAULT_MAX_PAYLOAD_LEN`](super::DEFAULT_MAX_PAYLOAD_LEN).
pub fn build_frame(payload_type: PayloadType, payload: &[u8]) -> Vec<u8> {
    match try_build_frame(payload_type, payload) {
        Ok(bytes) => bytes,
        Err(err) => panic!("{}", err),
    }
}

/// Build frame parts for scatter/gather I/O.
///
/// Returns the encoded header and a reference to the payload.
pub fn build_frame_parts(
    payload_type: PayloadType,
    payload: &[u8],
) -> Result<([u8; HEADER_SIZE], &[u8])> {
    let header = Header::try_for_payload(payload_type, payload.len())?;
    Ok((header.encode(), payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let frame = Frame::new(PayloadType::AudioData, Bytes::from_static(b"pcm"));

        assert_eq!(frame.payload_type, PayloadType::AudioData);
        assert_eq!(frame.payload(), b"pcm");
        assert_eq!(frame.payload_len(), 3);
        assert!(frame.is_audio());
        assert!(!frame.is_video());
    }

    #[test]
    fn test_frame_from_parts_copies() {
        let source = vec![1u8, 2, 3, 4];
        let frame = Frame::from_parts(PayloadType::VideoData, &source);

        assert_eq!(frame.payload(), &source[..]);
        assert_ne!(frame.payload.as_ptr(), source.as_ptr());
    }

    #[test]
    fn test_payload_bytes_zero_copy() {
        let original = Bytes::from_static(b"test data");
        let frame = Frame::new(PayloadType::VideoData, original.clone());

        let cloned = frame.payload_bytes();
        assert_eq!(cloned.as_ptr(), original.as_ptr());
    }

    #[test]
    fn test_frame_header() {
        let frame = Frame::from_parts(PayloadType::VideoDimension, &[0u8; 8]);
        let header = frame.header().unwrap();

        assert_eq!(header.payload_type, PayloadType::VIDEO_DIMENSION);
        assert_eq!(header.payload_length, 8);
        assert!(header.validate().is_ok());
    }

    #[test]
    fn test_build_frame() {
        let bytes = build_frame(PayloadType::VideoData, b"hello");

        assert_eq!(bytes.len(), HEADER_SIZE + 5);

        let parsed = Header::decode(&bytes[..HEADER_SIZE]).unwrap();
        assert_eq!(parsed.payload_type(), PayloadType::VideoData);
        assert_eq!(parsed.total_length_excluding_magic, 17);
        assert_eq!(&bytes[HEADER_SIZE..], b"hello");
    }

    #[test]
    fn test_build_frame_empty_payload() {
        let bytes = build_frame(PayloadType::Unknown(99), b"");
        assert_eq!(bytes.len(), HEADER_SIZE);
    }

    #[test]
    fn test_build_frame_parts_matches_build_frame() {
        let (header_bytes, payload) = build_frame_parts(PayloadType::AudioData, b"abc").unwrap();
        let mut joined = header_bytes.to_vec();
        joined.extend_from_slice(payload);

        assert_eq!(joined, build_frame(PayloadType::AudioData, b"abc"));
        assert_eq!(joined, try_build_frame(PayloadType::AudioData, b"abc").unwrap());
    }

    #[test]
    fn test_to_bytes_roundtrip() {
        use super::super::FrameBuffer;

        let frame = Frame::from_parts(PayloadType::AudioData, b"0123456789");
        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(&frame.to_bytes()).unwrap();

        assert_eq!(frames, vec![frame]);
    }
}
