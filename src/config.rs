//! Configuration for framers and frame channels.
//!
//! Both structs implement `Default` and serde, so an owning application can
//! embed them in its own settings file. Durations are (de)serialized as
//! milliseconds.
//!
//! # Example
//!
//! ```
//! use mrcwire::{ChannelConfig, FramerConfig};
//! use std::time::Duration;
//!
//! let config = ChannelConfig::default()
//!     .with_capacity(64)
//!     .with_send_timeout(Duration::from_millis(250))
//!     .with_framer(FramerConfig::default().with_max_payload_len(8 * 1024 * 1024));
//!
//! assert_eq!(config.capacity, 64);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol::{DEFAULT_MAX_PAYLOAD_LEN, DEFAULT_SCRATCH_CAPACITY};

/// Default channel capacity, in frames.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Default time a producer waits for queue space before giving up.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the frame buffer behind a framer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramerConfig {
    /// Bytes reserved up front for the scratch buffer.
    pub scratch_capacity: usize,
    /// Largest payload accepted before the header is treated as corrupt.
    pub max_payload_len: u32,
    /// Log a warning when the bytes after a frame don't start with the magic.
    pub check_next_magic: bool,
}

impl FramerConfig {
    /// Set the scratch buffer size reserved up front.
    pub fn with_scratch_capacity(mut self, scratch_capacity: usize) -> Self {
        self.scratch_capacity = scratch_capacity;
        self
    }

    /// Reject headers whose payload exceeds `max_payload_len` bytes.
    pub fn with_max_payload_len(mut self, max_payload_len: u32) -> Self {
        self.max_payload_len = max_payload_len;
        self
    }

    /// Toggle the advisory next-frame magic check.
    pub fn with_check_next_magic(mut self, check_next_magic: bool) -> Self {
        self.check_next_magic = check_next_magic;
        self
    }

    /// Whether this configuration imposes a payload limit.
    #[inline]
    pub fn limits_payload(&self) -> bool {
        self.max_payload_len < DEFAULT_MAX_PAYLOAD_LEN
    }
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            scratch_capacity: DEFAULT_SCRATCH_CAPACITY,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            check_next_magic: true,
        }
    }
}

/// Configuration for a bounded frame channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Frame buffer settings for the producer half.
    pub framer: FramerConfig,
    /// Maximum frames queued before the producer blocks. At least one.
    pub capacity: usize,
    /// How long the producer blocks per frame when the queue is full.
    #[serde(with = "duration_ms", rename = "send_timeout_ms")]
    pub send_timeout: Duration,
}

impl ChannelConfig {
    /// Set the frame buffer settings used by the producer half.
    pub fn with_framer(mut self, framer: FramerConfig) -> Self {
        self.framer = framer;
        self
    }

    /// Set the queue depth in frames. Zero is raised to one.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set how long a blocking send waits for queue space.
    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            framer: FramerConfig::default(),
            capacity: DEFAULT_CHANNEL_CAPACITY,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
