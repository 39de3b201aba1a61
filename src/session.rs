//! Per-connection session state.
//!
//! A session is either `Active` (accepting input) or `Errored` (terminal
//! until [`Session::reset`]). It also remembers when the first frame of the
//! session was parsed, which collaborators use to align audio and video.

use std::time::SystemTime;

use crate::error::FrameError;

/// Two-state session state machine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Accepting input.
    #[default]
    Active,
    /// A malformed header was seen; all input is discarded until reset.
    Errored(FrameError),
}

impl SessionState {
    /// Whether the session reached its terminal state.
    #[inline]
    pub fn is_errored(&self) -> bool {
        matches!(self, SessionState::Errored(_))
    }

    /// The fault that ended the session, if any.
    #[inline]
    pub fn error(&self) -> Option<FrameError> {
        match self {
            SessionState::Active => None,
            SessionState::Errored(err) => Some(*err),
        }
    }
}

/// Session bookkeeping shared by both framer flavours.
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: SessionState,
    first_frame_time: Option<SystemTime>,
    frames_parsed: u64,
}

impl Session {
    /// Fresh `Active` session with no first frame.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[inline]
    pub fn is_errored(&self) -> bool {
        self.state.is_errored()
    }

    /// Move to `Errored`. The first fault wins; later ones are ignored.
    pub fn fail(&mut self, err: FrameError) {
        if !self.state.is_errored() {
            self.state = SessionState::Errored(err);
        }
    }

    /// Record a successfully parsed frame and return its index in the session.
    ///
    /// The first call after construction or reset captures the first-frame time.
    pub fn record_frame(&mut self) -> u64 {
        if self.first_frame_time.is_none() {
            self.first_frame_time = Some(SystemTime::now());
        }
        let index = self.frames_parsed;
        self.frames_parsed += 1;
        index
    }

    /// True once a frame was parsed, unless the session has since errored.
    #[inline]
    pub fn has_first_frame(&self) -> bool {
        self.first_frame_time.is_some() && !self.is_errored()
    }

    /// Captured first-frame time, or the current time if none was captured.
    ///
    /// The fallback carries no session meaning; check `has_first_frame` first.
    pub fn first_frame_time(&self) -> SystemTime {
        self.first_frame_time.unwrap_or_else(SystemTime::now)
    }

    /// Captured first-frame time without fallback.
    #[inline]
    pub fn first_frame_time_opt(&self) -> Option<SystemTime> {
        self.first_frame_time
    }

    /// Frames recorded since construction or the last reset.
    #[inline]
    pub fn frames_parsed(&self) -> u64 {
        self.frames_parsed
    }

    /// Seconds elapsed since the first frame, for diagnostics.
    pub fn seconds_since_first_frame(&self) -> f64 {
        self.first_frame_time
            .and_then(|t| t.elapsed().ok())
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Back to a freshly constructed state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
