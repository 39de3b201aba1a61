//! Bounded frame channel with backpressure.
//!
//! An alternative to [`StreamFramer`](crate::StreamFramer) for consumers that
//! can fall behind. The producer half owns the frame buffer outright and hands
//! each completed frame to the consumer through a bounded `flume` channel:
//!
//! ```text
//! transport ─► FrameSender (scratch + parse) ─► flume::bounded(N) ─► FrameReceiver ─► decoder
//! ```
//!
//! When the channel is full, [`FrameSender::add_data`] blocks for up to the
//! configured send timeout and then returns [`MrcError::Backpressure`]. The
//! frame that didn't fit is kept and sent first on the next call (or on
//! [`FrameSender::flush`]), so nothing is lost while the consumer catches up.
//!
//! [`FrameSender::add_data_async`] waits for space instead. It is cancel safe:
//! a frame whose send was interrupted stays held by the sender and goes out
//! first on the next call, sync or async.
//!
//! Dropping every [`FrameReceiver`] wakes a waiting producer with
//! [`MrcError::Disconnected`].
//!
//! # Example
//!
//! ```
//! use mrcwire::channel;
//! use mrcwire::protocol::{build_frame, PayloadType};
//! use mrcwire::ChannelConfig;
//!
//! let (mut tx, rx) = channel::bounded(ChannelConfig::default().with_capacity(4));
//! tx.add_data(&build_frame(PayloadType::AudioSampleRate, &48_000u32.to_le_bytes())).unwrap();
//!
//! let frame = rx.pop_frame().unwrap();
//! assert_eq!(frame.payload_type, PayloadType::AudioSampleRate);
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::thread::{self, Thread};
use std::time::{Duration, Instant, SystemTime};

use flume::r#async::SendFut;
use flume::{RecvTimeoutError, SendTimeoutError, TrySendError};
use futures::task::{waker, ArcWake};
use tracing::{debug, trace, warn};

use crate::config::ChannelConfig;
use crate::error::{FrameError, MrcError, Result};
use crate::protocol::{Frame, FrameBuffer};
use crate::session::Session;

/// A send parked on a full channel. Owns its frame until flume takes it.
type HeldSend = Pin<Box<SendFut<'static, Frame>>>;

/// Create a connected sender/receiver pair.
///
/// A capacity of zero is raised to one.
pub fn bounded(config: ChannelConfig) -> (FrameSender, FrameReceiver) {
    let (tx, rx) = flume::bounded(config.capacity.max(1));
    let rx = Arc::new(rx);

    let sender = FrameSender {
        buffer: FrameBuffer::with_config(&config.framer),
        session: Session::new(),
        tx,
        queue: Arc::downgrade(&rx),
        pending: None,
        send_timeout: config.send_timeout,
    };

    (sender, FrameReceiver { rx })
}

/// Unparks the producer thread when a held send makes progress.
struct ThreadWaker(Thread);

impl ArcWake for ThreadWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.0.unpark();
    }
}

/// Producer half: parses transport bytes and forwards completed frames.
pub struct FrameSender {
    buffer: FrameBuffer,
    session: Session,
    tx: flume::Sender<Frame>,
    /// Lets `reset` discard frames the consumer hasn't taken yet without
    /// keeping the channel open.
    queue: Weak<flume::Receiver<Frame>>,
    /// Frame that didn't fit, sent before anything else.
    pending: Option<HeldSend>,
    send_timeout: Duration,
}

impl FrameSender {
    /// Ingest raw bytes and forward every frame they complete.
    ///
    /// Returns the number of frames handed to the channel by this call.
    ///
    /// # Errors
    ///
    /// - A parse error when this input corrupts the session
    /// - `SessionErrored` if the session was already errored (input discarded)
    /// - `Backpressure` if the channel stayed full for the send timeout;
    ///   the input is buffered and will be framed on the next call
    /// - `Disconnected` if the receiver was dropped
    pub fn add_data(&mut self, data: &[u8]) -> Result<usize> {
        if self.session.is_errored() {
            return Err(MrcError::SessionErrored);
        }

        trace!("add_data, len = {}", data.len());
        self.buffer.extend(data);
        self.pump()
    }

    /// Async variant of [`add_data`](Self::add_data) that waits for channel
    /// space instead of timing out.
    ///
    /// Cancelling the returned future loses nothing: the frame being sent is
    /// held and unparsed input stays buffered.
    pub async fn add_data_async(&mut self, data: &[u8]) -> Result<usize> {
        if self.session.is_errored() {
            return Err(MrcError::SessionErrored);
        }

        self.buffer.extend(data);

        let mut sent = 0;
        if self.pending.is_some() {
            self.finish_pending_async().await?;
            sent += 1;
        }
        while let Some(frame) = self.next_frame()? {
            match self.tx.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(frame)) => {
                    self.pending = Some(self.hold(frame));
                    self.finish_pending_async().await?;
                }
                Err(TrySendError::Disconnected(_)) => return Err(MrcError::Disconnected),
            }
            sent += 1;
        }
        Ok(sent)
    }

    /// Retry forwarding buffered frames without adding input.
    pub fn flush(&mut self) -> Result<usize> {
        if self.session.is_errored() {
            return Err(MrcError::SessionErrored);
        }
        self.pump()
    }

    fn pump(&mut self) -> Result<usize> {
        let mut sent = 0;

        if self.pending.is_some() {
            self.finish_pending()?;
            sent += 1;
        }

        while let Some(frame) = self.next_frame()? {
            self.send(frame)?;
            sent += 1;
        }

        Ok(sent)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match self.buffer.try_extract_one() {
            Ok(Some(frame)) => {
                let index = self.session.record_frame();
                trace!(
                    "new frame({}) parsed, type {:?}, payload {} bytes",
                    index,
                    frame.payload_type,
                    frame.payload_len()
                );
                Ok(Some(frame))
            }
            Ok(None) => Ok(None),
            Err(err) => {
                self.session.fail(err);
                Err(err.into())
            }
        }
    }

    fn send(&mut self, frame: Frame) -> Result<()> {
        match self.tx.send_timeout(frame, self.send_timeout) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(frame)) => {
                warn!(
                    "Frame channel full for {:?}, holding {:?} frame",
                    self.send_timeout, frame.payload_type
                );
                self.pending = Some(self.hold(frame));
                Err(MrcError::Backpressure)
            }
            Err(SendTimeoutError::Disconnected(_)) => Err(MrcError::Disconnected),
        }
    }

    fn hold(&self, frame: Frame) -> HeldSend {
        Box::pin(self.tx.clone().into_send_async(frame))
    }

    /// Drive the held send for at most the send timeout, blocking the thread.
    fn finish_pending(&mut self) -> Result<()> {
        let Some(send) = self.pending.as_mut() else {
            return Ok(());
        };

        let waker = waker(Arc::new(ThreadWaker(thread::current())));
        let mut cx = Context::from_waker(&waker);
        let deadline = Instant::now() + self.send_timeout;

        loop {
            if let Poll::Ready(result) = send.as_mut().poll(&mut cx) {
                self.pending = None;
                return result.map_err(|_| MrcError::Disconnected);
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    "Frame channel still full after {:?}, frame held",
                    self.send_timeout
                );
                return Err(MrcError::Backpressure);
            }
            thread::park_timeout(deadline - now);
        }
    }

    async fn finish_pending_async(&mut self) -> Result<()> {
        if let Some(send) = self.pending.as_mut() {
            let result = send.await;
            self.pending = None;
            result.map_err(|_| MrcError::Disconnected)?;
        }
        Ok(())
    }

    /// Clear the session, scratch buffer, held frame and queued frames.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.session.reset();
        self.pending = None;
        let discarded = self.queue.upgrade().map_or(0, |rx| rx.drain().count());
        debug!("Frame sender reset, discarded {} queued frames", discarded);
    }

    /// Whether the session hit a malformed header.
    pub fn has_error(&self) -> bool {
        self.session.is_errored()
    }

    /// The fault that stopped the session, if any.
    pub fn parse_error(&self) -> Option<FrameError> {
        self.session.state().error()
    }

    /// True once a frame was parsed this session and no error followed.
    pub fn has_first_frame(&self) -> bool {
        self.session.has_first_frame()
    }

    /// First-frame time, or now if none was captured.
    pub fn first_frame_time(&self) -> SystemTime {
        self.session.first_frame_time()
    }

    /// Bytes received but not yet resolved into frames.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether a frame is held back by backpressure.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Frames parsed since construction or the last reset, held one included.
    pub fn frames_parsed(&self) -> u64 {
        self.session.frames_parsed()
    }
}

impl std::fmt::Debug for FrameSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSender")
            .field("buffer", &self.buffer)
            .field("session", &self.session)
            .field("pending", &self.pending.is_some())
            .field("send_timeout", &self.send_timeout)
            .finish()
    }
}

/// Consumer half: pops frames in wire order.
///
/// Clones share one queue. The channel disconnects when the last clone drops.
#[derive(Debug, Clone)]
pub struct FrameReceiver {
    rx: Arc<flume::Receiver<Frame>>,
}

impl FrameReceiver {
    /// Remove and return the oldest frame without blocking.
    pub fn pop_frame(&self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }

    /// Whether at least one frame is waiting.
    pub fn has_completed_frame(&self) -> bool {
        !self.rx.is_empty()
    }

    /// Frames currently queued.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether no frame is queued.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Wait up to `timeout` for a frame. `Ok(None)` on timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Frame>> {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(MrcError::Disconnected),
        }
    }

    /// Wait for the next frame.
    pub async fn recv_async(&self) -> Result<Frame> {
        self.rx
            .recv_async()
            .await
            .map_err(|_| MrcError::Disconnected)
    }

    /// Whether the sender was dropped. Queued frames can still be popped.
    pub fn is_disconnected(&self) -> bool {
        self.rx.is_disconnected()
    }
}
