//! # mrcwire
//!
//! Stream framer for the mixed reality capture link of a head-mounted display.
//!
//! The headset sends one continuous byte stream carrying video dimensions,
//! encoded video, audio sample-rate announcements and audio chunks. Transport
//! reads split that stream at arbitrary points; this crate turns it back into
//! ordered, validated, typed frames.
//!
//! ## Architecture
//!
//! - **Protocol**: 16-byte little-endian header, scratch-buffer assembly
//! - **Framer**: [`StreamFramer`], one lock around scratch buffer, FIFO and
//!   session state, shared by a producer and a consumer thread
//! - **Channel**: [`channel::bounded`], the same parsing with a bounded
//!   handoff that applies backpressure instead of queueing without limit
//! - **Payload**: [`payload::CapturePayload`], typed view of each tag
//!
//! A corrupted header is fatal to the session: no resynchronization is
//! attempted, and the owner calls `reset` to start over.
//!
//! ## Example
//!
//! ```
//! use mrcwire::payload::CapturePayload;
//! use mrcwire::protocol::{build_frame, PayloadType};
//! use mrcwire::StreamFramer;
//!
//! let framer = StreamFramer::new();
//!
//! let bytes = build_frame(PayloadType::AudioSampleRate, &44_100u32.to_le_bytes());
//! for chunk in bytes.chunks(3) {
//!     framer.add_data(chunk);
//! }
//!
//! while let Some(frame) = framer.pop_frame() {
//!     if let Ok(CapturePayload::AudioSampleRate(rate)) = CapturePayload::try_from(&frame) {
//!         assert_eq!(rate, 44_100);
//!     }
//! }
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod io;
pub mod payload;
pub mod protocol;
pub mod session;

mod framer;

pub use channel::{FrameReceiver, FrameSender};
pub use config::{ChannelConfig, FramerConfig};
pub use error::{FrameError, MrcError};
pub use framer::StreamFramer;
pub use protocol::{Frame, PayloadType};
pub use session::SessionState;
