//! Typed views of frame payloads.
//!
//! The framer treats payloads as opaque. This module interprets them by tag:
//!
//! | Tag | Payload |
//! |---|---|
//! | `VideoDimension` | width `i32 LE`, height `i32 LE` (8 bytes) |
//! | `VideoData` | one encoded video access unit |
//! | `AudioSampleRate` | sample rate `u32 LE` (4 bytes) |
//! | `AudioData` | 16-byte audio header, then interleaved `f32 LE` samples |
//!
//! The audio header is `timestamp u64 LE`, `channels i32 LE`,
//! `data_length i32 LE` where `data_length` counts the sample bytes.
//!
//! # Example
//!
//! ```
//! use mrcwire::payload::{CapturePayload, VideoDimension};
//!
//! let frame = CapturePayload::VideoDimension(VideoDimension { width: 1920, height: 1080 }).to_frame();
//! match CapturePayload::try_from(&frame).unwrap() {
//!     CapturePayload::VideoDimension(dim) => assert_eq!(dim.width, 1920),
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{MrcError, Result};
use crate::protocol::{Frame, PayloadType};

/// Size of the header at the start of every audio payload.
pub const AUDIO_HEADER_SIZE: usize = 16;

const VIDEO_DIMENSION_SIZE: usize = 8;
const SAMPLE_RATE_SIZE: usize = 4;
const SAMPLE_SIZE: usize = std::mem::size_of::<f32>();

/// Encoded video size announced before the first access unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoDimension {
    pub width: i32,
    pub height: i32,
}

impl VideoDimension {
    fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() != VIDEO_DIMENSION_SIZE {
            return Err(MrcError::InvalidPayload(format!(
                "video dimension needs {} bytes, got {}",
                VIDEO_DIMENSION_SIZE,
                payload.len()
            )));
        }
        Ok(Self {
            width: i32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
            height: i32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]),
        })
    }

    /// Both dimensions are strictly positive.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// One chunk of interleaved float audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioPacket {
    /// Producer timestamp, passed through untouched.
    pub timestamp: u64,
    /// Interleaved channel count.
    pub channels: i32,
    /// Raw sample bytes, `f32 LE` interleaved.
    data: Bytes,
}

impl AudioPacket {
    /// Build a packet from samples (producer side).
    pub fn new(timestamp: u64, channels: i32, samples: &[f32]) -> Self {
        let mut data = BytesMut::with_capacity(samples.len() * SAMPLE_SIZE);
        for sample in samples {
            data.put_f32_le(*sample);
        }
        Self {
            timestamp,
            channels,
            data: data.freeze(),
        }
    }

    /// Parse an `AudioData` payload. Sample bytes are sliced, not copied.
    pub fn parse(payload: &Bytes) -> Result<Self> {
        if payload.len() < AUDIO_HEADER_SIZE {
            return Err(MrcError::InvalidPayload(format!(
                "audio payload shorter than {}-byte header: {}",
                AUDIO_HEADER_SIZE,
                payload.len()
            )));
        }

        let mut timestamp = [0u8; 8];
        timestamp.copy_from_slice(&payload[0..8]);
        let channels = i32::from_le_bytes([payload[8], payload[9], payload[10], payload[11]]);
        let data_length = i32::from_le_bytes([payload[12], payload[13], payload[14], payload[15]]);

        let available = payload.len() - AUDIO_HEADER_SIZE;
        let data_length = usize::try_from(data_length)
            .ok()
            .filter(|len| *len == available)
            .ok_or_else(|| {
                MrcError::InvalidPayload(format!(
                    "audio data length {} does not match {} sample bytes",
                    data_length, available
                ))
            })?;

        if data_length % SAMPLE_SIZE != 0 {
            return Err(MrcError::InvalidPayload(format!(
                "audio data length {} is not a whole number of f32 samples",
                data_length
            )));
        }
        if channels <= 0 {
            return Err(MrcError::InvalidPayload(format!(
                "audio channel count {}",
                channels
            )));
        }

        Ok(Self {
            timestamp: u64::from_le_bytes(timestamp),
            channels,
            data: payload.slice(AUDIO_HEADER_SIZE..),
        })
    }

    /// Raw sample bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Interleaved samples across all channels.
    pub fn samples(&self) -> impl Iterator<Item = f32> + '_ {
        self.data
            .chunks_exact(SAMPLE_SIZE)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    #[inline]
    pub fn sample_count(&self) -> usize {
        self.data.len() / SAMPLE_SIZE
    }

    /// Samples per channel.
    pub fn frames_per_channel(&self) -> usize {
        match usize::try_from(self.channels) {
            Ok(channels) if channels > 0 => self.sample_count() / channels,
            _ => 0,
        }
    }

    fn encode_into(&self, buf: &mut BytesMut) -> Result<()> {
        let data_length = i32::try_from(self.data.len())
            .map_err(|_| MrcError::PayloadOverflow(self.data.len()))?;
        buf.put_u64_le(self.timestamp);
        buf.put_i32_le(self.channels);
        buf.put_i32_le(data_length);
        buf.extend_from_slice(&self.data);
        Ok(())
    }
}

/// A frame payload interpreted according to its tag.
#[derive(Debug, Clone, PartialEq)]
pub enum CapturePayload {
    VideoDimension(VideoDimension),
    VideoData(Bytes),
    AudioSampleRate(u32),
    AudioData(AudioPacket),
}

impl CapturePayload {
    /// Tag this payload is carried under.
    pub fn payload_type(&self) -> PayloadType {
        match self {
            CapturePayload::VideoDimension(_) => PayloadType::VideoDimension,
            CapturePayload::VideoData(_) => PayloadType::VideoData,
            CapturePayload::AudioSampleRate(_) => PayloadType::AudioSampleRate,
            CapturePayload::AudioData(_) => PayloadType::AudioData,
        }
    }

    /// Encode to payload bytes (without frame header).
    ///
    /// # Errors
    ///
    /// `PayloadOverflow` if audio sample bytes don't fit the `i32` length field.
    pub fn try_encode(&self) -> Result<Bytes> {
        let bytes = match self {
            CapturePayload::VideoDimension(dim) => {
                let mut buf = BytesMut::with_capacity(VIDEO_DIMENSION_SIZE);
                buf.put_i32_le(dim.width);
                buf.put_i32_le(dim.height);
                buf.freeze()
            }
            CapturePayload::VideoData(data) => data.clone(),
            CapturePayload::AudioSampleRate(rate) => {
                Bytes::copy_from_slice(&rate.to_le_bytes())
            }
            CapturePayload::AudioData(packet) => {
                let mut buf = BytesMut::with_capacity(AUDIO_HEADER_SIZE + packet.data.len());
                packet.encode_into(&mut buf)?;
                buf.freeze()
            }
        };
        Ok(bytes)
    }

    /// Infallible form of [`try_encode`](Self::try_encode).
    ///
    /// # Panics
    ///
    /// If an audio packet carries more than `i32::MAX` sample bytes.
    pub fn encode(&self) -> Bytes {
        match self.try_encode() {
            Ok(bytes) => bytes,
            Err(err) => panic!("{}", err),
        }
    }

    /// Wrap this payload in a frame. Panics like [`encode`](Self::encode).
    pub fn to_frame(&self) -> Frame {
        Frame::new(self.payload_type(), self.encode())
    }
}

impl TryFrom<&Frame> for CapturePayload {
    type Error = MrcError;

    fn try_from(frame: &Frame) -> Result<Self> {
        match frame.payload_type {
            PayloadType::VideoDimension => {
                VideoDimension::parse(frame.payload()).map(CapturePayload::VideoDimension)
            }
            PayloadType::VideoData => Ok(CapturePayload::VideoData(frame.payload_bytes())),
            PayloadType::AudioSampleRate => {
                let payload = frame.payload();
                if payload.len() != SAMPLE_RATE_SIZE {
                    return Err(MrcError::InvalidPayload(format!(
                        "audio sample rate needs {} bytes, got {}",
                        SAMPLE_RATE_SIZE,
                        payload.len()
                    )));
                }
                Ok(CapturePayload::AudioSampleRate(u32::from_le_bytes([
                    payload[0], payload[1], payload[2], payload[3],
                ])))
            }
            PayloadType::AudioData => AudioPacket::parse(&frame.payload).map(CapturePayload::AudioData),
            PayloadType::Unknown(tag) => Err(MrcError::UnknownPayloadType(tag)),
        }
    }
}

impl TryFrom<Frame> for CapturePayload {
    type Error = MrcError;

    fn try_from(frame: Frame) -> Result<Self> {
        CapturePayload::try_from(&frame)
    }
}
