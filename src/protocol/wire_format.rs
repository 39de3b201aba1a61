//! Wire format encoding and decoding.
//!
//! Implements the 16-byte capture frame header:
//! ```text
//! ┌──────────┬──────────────┬──────────────┬──────────────┬─────────────┐
//! │ Magic    │ Total length │ Payload type │ Payload len  │ Payload     │
//! │ 4 bytes  │ 4 bytes      │ 4 bytes      │ 4 bytes      │ N bytes     │
//! │ uint32 LE│ uint32 LE    │ uint32 LE    │ uint32 LE    │ opaque      │
//! └──────────┴──────────────┴──────────────┴──────────────┴─────────────┘
//! ```
//!
//! `Total length` counts every byte after the magic field, so a well-formed
//! header always satisfies `payload_length == total_length + 4 - 16`.
//!
//! All multi-byte integers are Little Endian.

use crate::error::{FrameError, MrcError};

/// Header size in bytes (fixed, exactly 16).
pub const HEADER_SIZE: usize = 16;

/// Size of the magic field, which the total length does not cover.
pub const MAGIC_SIZE: usize = 4;

/// Protocol sentinel found at the start of every frame.
pub const MAGIC: u32 = 0x2877_AF94;

/// Bytes of header counted by `total_length_excluding_magic`.
const HEADER_SIZE_EXCLUDING_MAGIC: u32 = (HEADER_SIZE - MAGIC_SIZE) as u32;

/// Default maximum payload size (no limit beyond what the wire can express).
pub const DEFAULT_MAX_PAYLOAD_LEN: u32 = u32::MAX - HEADER_SIZE_EXCLUDING_MAGIC;

/// Payload type tag carried in the header.
///
/// Tags outside the known set are preserved in [`PayloadType::Unknown`] so the
/// framer never has to reject a frame based on its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadType {
    /// Width and height of the encoded video.
    VideoDimension,
    /// One encoded video access unit.
    VideoData,
    /// Audio sample-rate announcement.
    AudioSampleRate,
    /// A chunk of audio samples.
    AudioData,
    /// Any other tag value.
    Unknown(u32),
}

impl PayloadType {
    pub const VIDEO_DIMENSION: u32 = 10;
    pub const VIDEO_DATA: u32 = 11;
    pub const AUDIO_SAMPLE_RATE: u32 = 12;
    pub const AUDIO_DATA: u32 = 13;

    /// Raw tag value as it appears on the wire.
    #[inline]
    pub fn as_u32(self) -> u32 {
        match self {
            PayloadType::VideoDimension => Self::VIDEO_DIMENSION,
            PayloadType::VideoData => Self::VIDEO_DATA,
            PayloadType::AudioSampleRate => Self::AUDIO_SAMPLE_RATE,
            PayloadType::AudioData => Self::AUDIO_DATA,
            PayloadType::Unknown(tag) => tag,
        }
    }

    /// Check if this is one of the four known tags.
    #[inline]
    pub fn is_known(self) -> bool {
        !matches!(self, PayloadType::Unknown(_))
    }

    /// Check if this tag belongs to the video stream.
    #[inline]
    pub fn is_video(self) -> bool {
        matches!(self, PayloadType::VideoDimension | PayloadType::VideoData)
    }

    /// Check if this tag belongs to the audio stream.
    #[inline]
    pub fn is_audio(self) -> bool {
        matches!(self, PayloadType::AudioSampleRate | PayloadType::AudioData)
    }
}

impl From<u32> for PayloadType {
    fn from(tag: u32) -> Self {
        match tag {
            Self::VIDEO_DIMENSION => PayloadType::VideoDimension,
            Self::VIDEO_DATA => PayloadType::VideoData,
            Self::AUDIO_SAMPLE_RATE => PayloadType::AudioSampleRate,
            Self::AUDIO_DATA => PayloadType::AudioData,
            other => PayloadType::Unknown(other),
        }
    }
}

impl From<PayloadType> for u32 {
    fn from(payload_type: PayloadType) -> Self {
        payload_type.as_u32()
    }
}

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Sentinel, [`MAGIC`] for a genuine frame boundary.
    pub magic: u32,
    /// Bytes remaining in the frame after the magic field.
    pub total_length_excluding_magic: u32,
    /// Raw payload type tag.
    pub payload_type: u32,
    /// Payload length in bytes.
    pub payload_length: u32,
}

impl Header {
    /// Create a header from raw field values.
    pub fn new(
        magic: u32,
        total_length_excluding_magic: u32,
        payload_type: u32,
        payload_length: u32,
    ) -> Self {
        Self {
            magic,
            total_length_excluding_magic,
            payload_type,
            payload_length,
        }
    }

    /// Create a consistent header for a payload of the given type and length.
    ///
    /// # Example
    ///
    /// ```
    /// use mrcwire::protocol::{Header, PayloadType, MAGIC};
    ///
    /// let header = Header::for_payload(PayloadType::VideoData, 8);
    /// assert_eq!(header.magic, MAGIC);
    /// assert_eq!(header.total_length_excluding_magic, 20);
    /// assert!(header.validate().is_ok());
    /// ```
    pub fn for_payload(payload_type: PayloadType, payload_length: u32) -> Self {
        Self {
            magic: MAGIC,
            total_length_excluding_magic: payload_length
                .saturating_add(HEADER_SIZE_EXCLUDING_MAGIC),
            payload_type: payload_type.as_u32(),
            payload_length,
        }
    }

    /// Header for a payload of `len` bytes, checking that it fits the wire.
    ///
    /// # Errors
    ///
    /// `PayloadOverflow` if `len` exceeds [`DEFAULT_MAX_PAYLOAD_LEN`], the
    /// largest payload whose total length fits in 32 bits.
    pub fn try_for_payload(payload_type: PayloadType, len: usize) -> Result<Self, MrcError> {
        u32::try_from(len)
            .ok()
            .filter(|&n| n <= DEFAULT_MAX_PAYLOAD_LEN)
            .map(|n| Self::for_payload(payload_type, n))
            .ok_or(MrcError::PayloadOverflow(len))
    }

    /// Encode header to bytes (Little Endian).
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (16 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        buf[0..4].copy_from_slice(&self.magic.to_le_bytes());
        buf[4..8].copy_from_slice(&self.total_length_excluding_magic.to_le_bytes());
        buf[8..12].copy_from_slice(&self.payload_type.to_le_bytes());
        buf[12..16].copy_from_slice(&self.payload_length.to_le_bytes());
    }

    /// Decode header from bytes (Little Endian).
    ///
    /// Returns `None` if buffer is too short. No field is validated here.
    ///
    /// # Example
    ///
    /// ```
    /// use mrcwire::protocol::{Header, MAGIC};
    ///
    /// let bytes = [
    ///     0x94, 0xAF, 0x77, 0x28, // magic
    ///     20, 0, 0, 0,            // total length excluding magic
    ///     11, 0, 0, 0,            // payload type
    ///     8, 0, 0, 0,             // payload length
    /// ];
    /// let header = Header::decode(&bytes).unwrap();
    /// assert_eq!(header.magic, MAGIC);
    /// assert_eq!(header.payload_length, 8);
    /// ```
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            magic: read_u32_le(buf, 0),
            total_length_excluding_magic: read_u32_le(buf, 4),
            payload_type: read_u32_le(buf, 8),
            payload_length: read_u32_le(buf, 12),
        })
    }

    /// Decoded payload type tag.
    #[inline]
    pub fn payload_type(&self) -> PayloadType {
        PayloadType::from(self.payload_type)
    }

    /// Check the sentinel.
    #[inline]
    pub fn has_valid_magic(&self) -> bool {
        self.magic == MAGIC
    }

    /// Total bytes this frame occupies on the wire, magic included.
    ///
    /// Computed in `u64` so a hostile length cannot overflow on any target.
    #[inline]
    pub fn frame_len(&self) -> u64 {
        MAGIC_SIZE as u64 + u64::from(self.total_length_excluding_magic)
    }

    /// Payload length implied by the total length field.
    ///
    /// Returns `None` when the total length is too short to cover the header.
    #[inline]
    pub fn expected_payload_length(&self) -> Option<u64> {
        self.frame_len().checked_sub(HEADER_SIZE as u64)
    }

    /// Check the sentinel only.
    pub fn validate_magic(&self) -> Result<(), FrameError> {
        if !self.has_valid_magic() {
            return Err(FrameError::MagicMismatch {
                expected: MAGIC,
                found: self.magic,
            });
        }
        Ok(())
    }

    /// Check that both length fields describe the same payload.
    pub fn validate_lengths(&self) -> Result<(), FrameError> {
        if self.expected_payload_length() != Some(u64::from(self.payload_length)) {
            return Err(FrameError::LengthMismatch {
                total_length: self.total_length_excluding_magic,
                payload_length: self.payload_length,
            });
        }
        Ok(())
    }

    /// Validate the header for protocol compliance.
    ///
    /// Checks:
    /// - Magic equals [`MAGIC`]
    /// - `payload_length == total_length_excluding_magic + 4 - 16`
    pub fn validate(&self) -> Result<(), FrameError> {
        self.validate_magic()?;
        self.validate_lengths()
    }
}

#[inline]
fn read_u32_le(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

/// Read only the magic field at `offset`, if enough bytes are present.
#[inline]
pub fn peek_magic(buf: &[u8], offset: usize) -> Option<u32> {
    if buf.len() < offset.checked_add(MAGIC_SIZE)? {
        return None;
    }
    Some(read_u32_le(buf, offset))
}

/// Encode a header to bytes (standalone function).
#[inline]
pub fn encode_header(header: &Header) -> [u8; HEADER_SIZE] {
    header.encode()
}

/// Decode a header from bytes (standalone function).
#[inline]
pub fn decode_header(buf: &[u8]) -> Option<Header> {
    Header::decode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_encode_decode_roundtrip() {
        let original = Header::for_payload(PayloadType::AudioData, 4096);
        let encoded = original.encode();
        let decoded = Header::decode(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_header_little_endian_byte_order() {
        let header = Header::new(0x0102_0304, 0x0506_0708, 0x090A_0B0C, 0x0D0E_0F10);
        let bytes = header.encode();

        assert_eq!(&bytes[0..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[4..8], &[0x08, 0x07, 0x06, 0x05]);
        assert_eq!(&bytes[8..12], &[0x0C, 0x0B, 0x0A, 0x09]);
        assert_eq!(&bytes[12..16], &[0x10, 0x0F, 0x0E, 0x0D]);
    }

    #[test]
    fn test_magic_wire_bytes() {
        let bytes = Header::for_payload(PayloadType::VideoData, 0).encode();
        assert_eq!(&bytes[0..4], &[0x94, 0xAF, 0x77, 0x28]);
    }

    #[test]
    fn test_decode_too_short_buffer() {
        let buf = [0u8; 15];
        assert!(Header::decode(&buf).is_none());
    }

    #[test]
    fn test_for_payload_lengths() {
        let header = Header::for_payload(PayloadType::VideoData, 8);
        assert_eq!(header.total_length_excluding_magic, 20);
        assert_eq!(header.frame_len(), 24);
        assert_eq!(header.expected_payload_length(), Some(8));

        let empty = Header::for_payload(PayloadType::VideoDimension, 0);
        assert_eq!(empty.total_length_excluding_magic, 12);
        assert_eq!(empty.frame_len(), HEADER_SIZE as u64);
    }

    #[test]
    fn test_try_for_payload_rejects_oversize() {
        let header = Header::try_for_payload(PayloadType::VideoData, 8).unwrap();
        assert_eq!(header.total_length_excluding_magic, 20);

        let max = DEFAULT_MAX_PAYLOAD_LEN as usize;
        let header = Header::try_for_payload(PayloadType::VideoData, max).unwrap();
        assert_eq!(header.total_length_excluding_magic, u32::MAX);

        assert!(matches!(
            Header::try_for_payload(PayloadType::VideoData, max + 1),
            Err(MrcError::PayloadOverflow(n)) if n == max + 1
        ));
    }

    #[test]
    fn test_validate_wrong_magic() {
        let header = Header::new(0xDEAD_BEEF, 20, 11, 8);
        let err = header.validate().unwrap_err();
        assert_eq!(
            err,
            FrameError::MagicMismatch {
                expected: MAGIC,
                found: 0xDEAD_BEEF
            }
        );
    }

    #[test]
    fn test_validate_length_mismatch() {
        let header = Header::new(MAGIC, 20, 11, 9);
        assert!(matches!(
            header.validate(),
            Err(FrameError::LengthMismatch {
                total_length: 20,
                payload_length: 9
            })
        ));
    }

    #[test]
    fn test_validate_total_shorter_than_header() {
        // 4 + 5 < 16, no payload length can satisfy this header
        let header = Header::new(MAGIC, 5, 11, 0);
        assert_eq!(header.expected_payload_length(), None);
        assert!(header.validate_lengths().is_err());
    }

    #[test]
    fn test_frame_len_does_not_overflow() {
        let header = Header::new(MAGIC, u32::MAX, 11, u32::MAX - 12);
        assert_eq!(header.frame_len(), u64::from(u32::MAX) + 4);
        assert!(header.validate().is_ok());
    }

    #[test]
    fn test_payload_type_mapping() {
        assert_eq!(PayloadType::from(10), PayloadType::VideoDimension);
        assert_eq!(PayloadType::from(11), PayloadType::VideoData);
        assert_eq!(PayloadType::from(12), PayloadType::AudioSampleRate);
        assert_eq!(PayloadType::from(13), PayloadType::AudioData);
        assert_eq!(PayloadType::from(42), PayloadType::Unknown(42));
        assert_eq!(u32::from(PayloadType::Unknown(42)), 42);

        assert!(PayloadType::VideoData.is_video());
        assert!(PayloadType::AudioSampleRate.is_audio());
        assert!(!PayloadType::Unknown(1).is_known());
    }

    #[test]
    fn test_peek_magic() {
        let mut buf = vec![0u8; 4];
        buf.extend_from_slice(&MAGIC.to_le_bytes());
        assert_eq!(peek_magic(&buf, 4), Some(MAGIC));
        assert_eq!(peek_magic(&buf, 5), None);
        assert_eq!(peek_magic(&buf, usize::MAX), None);
    }

    #[test]
    fn test_standalone_functions() {
        let header = Header::for_payload(PayloadType::AudioSampleRate, 4);
        let encoded = encode_header(&header);
        assert_eq!(decode_header(&encoded), Some(header));
    }
}
