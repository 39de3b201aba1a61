//! Thread-safe stream framer.
//!
//! [`StreamFramer`] is the shared unit between one transport thread that
//! feeds bytes with [`add_data`](StreamFramer::add_data) and one consumer
//! that polls [`pop_frame`](StreamFramer::pop_frame). A single mutex guards
//! the scratch buffer, the frame queue and the session state together; every
//! call holds it for its full duration and does no I/O under it.
//!
//! ```text
//! transport ─► add_data ─► [scratch ─► header scan ─► extract] ─► queue ─► pop_frame ─► decoder
//! ```
//!
//! A malformed header moves the session to `Errored`. From then on input is
//! discarded and no frame is produced until [`reset`](StreamFramer::reset).
//!
//! # Example
//!
//! ```
//! use mrcwire::protocol::{build_frame, PayloadType};
//! use mrcwire::StreamFramer;
//!
//! let framer = StreamFramer::new();
//! framer.add_data(&build_frame(PayloadType::VideoData, &[0u8; 8]));
//!
//! let frame = framer.pop_frame().unwrap();
//! assert_eq!(frame.payload_type, PayloadType::VideoData);
//! assert!(framer.pop_frame().is_none());
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use tracing::{debug, trace};

use crate::config::FramerConfig;
use crate::error::FrameError;
use crate::protocol::{Frame, FrameBuffer};
use crate::session::Session;

/// Everything guarded by the framer lock.
#[derive(Debug)]
struct Inner {
    buffer: FrameBuffer,
    frames: VecDeque<Frame>,
    session: Session,
}

impl Inner {
    fn ingest(&mut self, data: &[u8]) {
        if self.session.is_errored() {
            return;
        }

        trace!("add_data, len = {}", data.len());
        self.buffer.extend(data);

        loop {
            match self.buffer.try_extract_one() {
                Ok(Some(frame)) => {
                    let index = self.session.record_frame();
                    trace!(
                        "[{:.6}] new frame({}) pushed, type {:?}, payload {} bytes",
                        self.session.seconds_since_first_frame(),
                        index,
                        frame.payload_type,
                        frame.payload_len()
                    );
                    self.frames.push_back(frame);
                }
                Ok(None) => break,
                Err(err) => {
                    self.session.fail(err);
                    break;
                }
            }
        }
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.frames.clear();
        self.session.reset();
    }
}

/// Incremental framer with an internal FIFO of completed frames.
#[derive(Debug)]
pub struct StreamFramer {
    inner: Mutex<Inner>,
}

impl StreamFramer {
    /// Create a framer with the default 16 MiB scratch buffer.
    pub fn new() -> Self {
        Self::with_config(FramerConfig::default())
    }

    /// Create a framer with custom scratch size, payload limit and checks.
    pub fn with_config(config: FramerConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                buffer: FrameBuffer::with_config(&config),
                frames: VecDeque::new(),
                session: Session::new(),
            }),
        }
    }

    // Poisoned guards are recovered: state is consistent on every exit path.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ingest raw bytes from the transport.
    ///
    /// Chunks may split frames anywhere. Completed frames are queued in wire
    /// order. Does nothing once the session has errored.
    pub fn add_data(&self, data: &[u8]) {
        self.lock().ingest(data);
    }

    /// Whether at least one frame is waiting.
    pub fn has_completed_frame(&self) -> bool {
        !self.lock().frames.is_empty()
    }

    /// Remove and return the oldest completed frame. Never blocks.
    pub fn pop_frame(&self) -> Option<Frame> {
        self.lock().frames.pop_front()
    }

    /// Remove every completed frame at once, oldest first.
    pub fn drain_frames(&self) -> Vec<Frame> {
        self.lock().frames.drain(..).collect()
    }

    /// Clear the error, scratch buffer, queue and first-frame time.
    pub fn reset(&self) {
        self.lock().reset();
        debug!("Stream framer reset");
    }

    /// Whether the session hit a malformed header.
    pub fn has_error(&self) -> bool {
        self.lock().session.is_errored()
    }

    /// The fault that stopped the session, if any.
    pub fn parse_error(&self) -> Option<FrameError> {
        self.lock().session.state().error()
    }

    /// True once a frame was parsed this session and no error followed.
    pub fn has_first_frame(&self) -> bool {
        self.lock().session.has_first_frame()
    }

    /// When the first frame of this session was parsed.
    ///
    /// Falls back to the current time if no frame was parsed yet; check
    /// [`has_first_frame`](Self::has_first_frame) before relying on it.
    pub fn first_frame_time(&self) -> SystemTime {
        self.lock().session.first_frame_time()
    }

    /// Bytes received but not yet resolved into frames.
    pub fn buffered_len(&self) -> usize {
        self.lock().buffer.len()
    }

    /// Frames waiting to be popped.
    pub fn queued_frames(&self) -> usize {
        self.lock().frames.len()
    }

    /// Frames parsed since construction or the last reset.
    pub fn frames_parsed(&self) -> u64 {
        self.lock().session.frames_parsed()
    }
}

impl Default for StreamFramer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{build_frame, Header, PayloadType, HEADER_SIZE, MAGIC};
    use std::sync::Arc;

    fn framer() -> StreamFramer {
        StreamFramer::with_config(FramerConfig::default().with_scratch_capacity(4096))
    }

    #[test]
    fn test_new_framer_state() {
        let framer = framer();
        assert!(!framer.has_error());
        assert!(!framer.has_completed_frame());
        assert!(!framer.has_first_frame());
        assert!(framer.pop_frame().is_none());
        assert_eq!(framer.buffered_len(), 0);
    }

    #[test]
    fn test_video_data_scenario() {
        let framer = framer();
        let header = Header::new(MAGIC, 20, 11, 8);
        let mut bytes = header.encode().to_vec();
        bytes.extend_from_slice(&[9, 8, 7, 6, 5, 4, 3, 2]);

        framer.add_data(&bytes);

        let frame = framer.pop_frame().unwrap();
        assert_eq!(frame.payload_type, PayloadType::VideoData);
        assert_eq!(frame.payload(), &[9, 8, 7, 6, 5, 4, 3, 2]);
        assert_eq!(framer.buffered_len(), 0);
        assert!(framer.pop_frame().is_none());
    }

    #[test]
    fn test_fifo_order() {
        let framer = framer();
        for i in 0u8..5 {
            framer.add_data(&build_frame(PayloadType::AudioData, &[i]));
        }

        assert_eq!(framer.queued_frames(), 5);
        for i in 0u8..5 {
            assert_eq!(framer.pop_frame().unwrap().payload(), &[i]);
        }
    }

    #[test]
    fn test_partial_delivery() {
        let framer = framer();
        let payload: Vec<u8> = (0..30).collect();
        let bytes = build_frame(PayloadType::VideoData, &payload);

        framer.add_data(&bytes[..HEADER_SIZE]);
        assert!(!framer.has_completed_frame());
        framer.add_data(&bytes[HEADER_SIZE..HEADER_SIZE + 10]);
        assert!(!framer.has_completed_frame());
        framer.add_data(&bytes[HEADER_SIZE + 10..HEADER_SIZE + 20]);
        assert!(!framer.has_completed_frame());
        framer.add_data(&bytes[HEADER_SIZE + 20..]);

        assert!(framer.has_completed_frame());
        assert_eq!(framer.pop_frame().unwrap().payload(), &payload[..]);
        assert!(!framer.has_completed_frame());
    }

    #[test]
    fn test_magic_mismatch_is_sticky() {
        let framer = framer();
        let good = build_frame(PayloadType::VideoData, b"one");
        let mut bad = build_frame(PayloadType::VideoData, b"two");
        bad[3] = 0;

        let mut bytes = good.clone();
        bytes.extend_from_slice(&bad);
        bytes.extend_from_slice(&good);
        framer.add_data(&bytes);

        assert!(framer.has_error());
        assert!(matches!(
            framer.parse_error(),
            Some(FrameError::MagicMismatch { .. })
        ));
        // Frame before the fault is still delivered
        assert_eq!(framer.pop_frame().unwrap().payload(), b"one");
        assert!(framer.pop_frame().is_none());

        // Later valid input is ignored
        framer.add_data(&good);
        assert!(!framer.has_completed_frame());
    }

    #[test]
    fn test_length_mismatch_never_emitted() {
        let framer = framer();
        let header = Header::new(MAGIC, 20, 11, 7);
        let mut bytes = header.encode().to_vec();
        bytes.extend_from_slice(&[0u8; 8]);

        framer.add_data(&bytes);

        assert!(framer.has_error());
        assert!(matches!(
            framer.parse_error(),
            Some(FrameError::LengthMismatch { .. })
        ));
        assert!(framer.pop_frame().is_none());
    }

    #[test]
    fn test_first_frame_flag() {
        let framer = framer();
        framer.add_data(&build_frame(PayloadType::VideoDimension, &[0u8; 8]));
        assert!(framer.has_first_frame());
        let first = framer.first_frame_time();

        framer.add_data(&build_frame(PayloadType::VideoData, b"x"));
        assert_eq!(framer.first_frame_time(), first);
        assert_eq!(framer.frames_parsed(), 2);

        framer.add_data(&[0u8; HEADER_SIZE]);
        assert!(framer.has_error());
        assert!(!framer.has_first_frame());
    }

    #[test]
    fn test_reset_restores_fresh_state() {
        let framer = framer();
        framer.add_data(&build_frame(PayloadType::VideoData, b"x"));
        framer.add_data(&[1, 2, 3]);
        framer.add_data(&[0xFF; HEADER_SIZE]);
        assert!(framer.has_error());

        framer.reset();

        assert!(!framer.has_error());
        assert!(framer.parse_error().is_none());
        assert!(!framer.has_completed_frame());
        assert!(!framer.has_first_frame());
        assert_eq!(framer.buffered_len(), 0);
        assert_eq!(framer.frames_parsed(), 0);

        framer.add_data(&build_frame(PayloadType::AudioData, b"again"));
        assert_eq!(framer.pop_frame().unwrap().payload(), b"again");
    }

    #[test]
    fn test_drain_frames() {
        let framer = framer();
        framer.add_data(&build_frame(PayloadType::VideoData, b"a"));
        framer.add_data(&build_frame(PayloadType::VideoData, b"b"));

        let frames = framer.drain_frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].payload(), b"b");
        assert!(!framer.has_completed_frame());
    }

    #[test]
    fn test_producer_consumer_threads() {
        let framer = Arc::new(framer());
        let mut stream = Vec::new();
        for i in 0u32..200 {
            stream.extend(build_frame(PayloadType::VideoData, &i.to_le_bytes()));
        }

        let producer = {
            let framer = framer.clone();
            std::thread::spawn(move || {
                for chunk in stream.chunks(7) {
                    framer.add_data(chunk);
                }
            })
        };

        let mut received = Vec::new();
        while received.len() < 200 {
            match framer.pop_frame() {
                Some(frame) => received.push(frame),
                None => std::thread::yield_now(),
            }
        }
        producer.join().unwrap();

        for (i, frame) in received.iter().enumerate() {
            assert_eq!(frame.payload(), &(i as u32).to_le_bytes());
        }
        assert!(!framer.has_error());
    }
}
