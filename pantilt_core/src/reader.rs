//! Pull frames out of a `ByteSource`.
//!
//! Two interchangeable strategies satisfy the same contract (a frame only
//! ever comes out when exactly `W*H` bytes were bounded by both markers):
//!
//! - `StreamFrameReader` feeds whatever the link returns into the
//!   byte-oriented `FrameDecoder` and enforces the framing timeout on any
//!   capture in progress.
//! - `ExactFrameReader` syncs on `START_IMAGE`, does one bounded read of the
//!   payload, then expects `END_IMAGE` right after it. Any failure clears the
//!   link's pending input before the next attempt.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use pantilt_traits::clock::{Clock, MonotonicClock};
use pantilt_traits::{ByteSource, Frame};

use crate::config::DecoderCfg;
use crate::decoder::{DecoderStats, END_MARKER, FrameDecoder, RESET_MARKER, START_MARKER, contains};
use crate::error::FrameError;
use crate::hw_error::map_source_error;
use crate::util::bounded_timeout;

const READ_CHUNK_BYTES: usize = 4096;
const MAX_LINE_BYTES: usize = 256;

/// A source of complete frames.
///
/// `Ok(None)` means no frame completed within one bounded wait; `Err` names
/// why an in-flight frame was dropped. Neither is fatal: call again.
pub trait FrameReader {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError>;

    fn stats(&self) -> DecoderStats;

    /// Drop pending input on the underlying link.
    fn clear_input(&mut self) -> Result<(), FrameError>;

    /// Register a stop flag checked after every blocking read.
    fn attach_cancel(&mut self, _flag: Arc<AtomicBool>) {}
}

impl<T: FrameReader + ?Sized> FrameReader for Box<T> {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        (**self).next_frame()
    }

    fn stats(&self) -> DecoderStats {
        (**self).stats()
    }

    fn clear_input(&mut self) -> Result<(), FrameError> {
        (**self).clear_input()
    }

    fn attach_cancel(&mut self, flag: Arc<AtomicBool>) {
        (**self).attach_cancel(flag);
    }
}

fn clear_source<S: ByteSource>(source: &mut S) -> Result<(), FrameError> {
    source
        .clear_input()
        .map_err(|e| FrameError::Source(e.to_string()))
}

// ── Streaming ────────────────────────────────────────────────────────────────

pub struct StreamFrameReader<S, C = MonotonicClock> {
    source: S,
    clock: C,
    decoder: FrameDecoder,
    cfg: DecoderCfg,
    buf: Vec<u8>,
    ready: VecDeque<Frame>,
    /// Capture epoch and the time that capture was first seen open.
    capture_started: Option<(u64, Instant)>,
}

impl<S: ByteSource> StreamFrameReader<S, MonotonicClock> {
    pub fn new(source: S, cfg: DecoderCfg) -> Self {
        Self::with_clock(source, cfg, MonotonicClock::new())
    }
}

impl<S: ByteSource, C: Clock> StreamFrameReader<S, C> {
    pub fn with_clock(source: S, cfg: DecoderCfg, clock: C) -> Self {
        Self {
            source,
            clock,
            decoder: FrameDecoder::new(cfg.width, cfg.height),
            cfg,
            buf: vec![0; READ_CHUNK_BYTES],
            ready: VecDeque::new(),
            capture_started: None,
        }
    }

    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// One bounded read from the source. Completed frames are queued;
    /// the error, if any, names a frame dropped during this read.
    pub fn poll(&mut self) -> Result<(), FrameError> {
        let n = match self.source.read(&mut self.buf, self.cfg.poll_timeout()) {
            Ok(n) => n,
            Err(e) => match map_source_error(&*e) {
                FrameError::FramingTimeout => 0,
                err => {
                    self.decoder.abandon(&err);
                    self.capture_started = None;
                    return Err(err);
                }
            },
        };

        let before = self.decoder.stats();
        if n > 0 {
            let frames = self.decoder.feed(&self.buf[..n]);
            self.ready.extend(frames);
        }
        let after = self.decoder.stats();

        let now = self.clock.now();
        if self.decoder.is_capturing() {
            let epoch = self.decoder.capture_epoch();
            let started = match self.capture_started {
                Some((seen, at)) if seen == epoch => at,
                _ => {
                    self.capture_started = Some((epoch, now));
                    now
                }
            };
            if now.saturating_duration_since(started) >= self.cfg.marker_timeout() {
                self.decoder.abandon(&FrameError::FramingTimeout);
                self.capture_started = None;
                return Err(FrameError::FramingTimeout);
            }
        } else {
            self.capture_started = None;
        }

        if after.overruns > before.overruns {
            return Err(FrameError::Overrun);
        }
        Ok(())
    }
}

impl<S: ByteSource, C: Clock> FrameReader for StreamFrameReader<S, C> {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        if let Some(frame) = self.ready.pop_front() {
            return Ok(Some(frame));
        }
        let polled = self.poll();
        if let Some(frame) = self.ready.pop_front() {
            // A drop during the same read is already counted in the stats.
            return Ok(Some(frame));
        }
        polled.map(|()| None)
    }

    fn stats(&self) -> DecoderStats {
        self.decoder.stats()
    }

    fn clear_input(&mut self) -> Result<(), FrameError> {
        self.decoder.abandon(&FrameError::Cancelled);
        self.ready.clear();
        self.capture_started = None;
        clear_source(&mut self.source)
    }
}

// ── Exact read ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineOverflow {
    /// Drop the oldest bytes; used while hunting for a marker in noise.
    Truncate,
    /// Too many bytes before a newline means the sender overran the frame.
    Fail,
}

pub struct ExactFrameReader<S, C = MonotonicClock> {
    source: S,
    clock: C,
    cfg: DecoderCfg,
    chunk: Vec<u8>,
    /// Bytes read past the point the current phase needed.
    carry: Vec<u8>,
    stats: DecoderStats,
    cancel: Option<Arc<AtomicBool>>,
}

impl<S: ByteSource> ExactFrameReader<S, MonotonicClock> {
    pub fn new(source: S, cfg: DecoderCfg) -> Self {
        Self::with_clock(source, cfg, MonotonicClock::new())
    }
}

impl<S: ByteSource, C: Clock> ExactFrameReader<S, C> {
    pub fn with_clock(source: S, cfg: DecoderCfg, clock: C) -> Self {
        Self {
            source,
            clock,
            cfg,
            chunk: vec![0; READ_CHUNK_BYTES],
            carry: Vec::new(),
            stats: DecoderStats::default(),
            cancel: None,
        }
    }

    pub fn into_source(self) -> S {
        self.source
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|f| f.load(Ordering::Relaxed))
    }

    fn read_chunk(&mut self, deadline: Instant) -> Result<usize, FrameError> {
        let timeout = bounded_timeout(self.cfg.poll_timeout(), deadline, self.clock.now());
        match self.source.read(&mut self.chunk, timeout) {
            Ok(n) => {
                self.carry.extend_from_slice(&self.chunk[..n]);
                Ok(n)
            }
            Err(e) => match map_source_error(&*e) {
                FrameError::FramingTimeout => Ok(0),
                err => Err(err),
            },
        }
    }

    /// Next newline-terminated line, or `None` once `deadline` passes.
    fn read_line(
        &mut self,
        deadline: Instant,
        overflow: LineOverflow,
    ) -> Result<Option<Vec<u8>>, FrameError> {
        loop {
            if let Some(pos) = self.carry.iter().position(|&b| b == b'\n') {
                return Ok(Some(self.carry.drain(..=pos).collect()));
            }
            if self.carry.len() > MAX_LINE_BYTES {
                match overflow {
                    LineOverflow::Truncate => {
                        let cut = self.carry.len() - MAX_LINE_BYTES / 2;
                        self.carry.drain(..cut);
                    }
                    LineOverflow::Fail => return Err(FrameError::Overrun),
                }
            }
            if self.clock.now() >= deadline {
                return Ok(None);
            }
            self.read_chunk(deadline)?;
            if self.cancelled() {
                return Err(FrameError::Cancelled);
            }
        }
    }

    fn sync_start(&mut self) -> Result<(), FrameError> {
        let deadline = self.clock.deadline_after(self.cfg.marker_timeout());
        loop {
            match self.read_line(deadline, LineOverflow::Truncate)? {
                Some(line) if contains(&line, START_MARKER) => return Ok(()),
                Some(line) if contains(&line, RESET_MARKER) => {
                    tracing::debug!("camera reset banner; resync");
                    self.stats.resets += 1;
                }
                Some(_) => {}
                None => return Err(FrameError::FramingTimeout),
            }
        }
    }

    fn read_payload(&mut self) -> Result<Vec<u8>, FrameError> {
        let expected = self.cfg.frame_len();
        let deadline = self.clock.deadline_after(self.cfg.payload_timeout());
        while self.carry.len() < expected {
            if self.clock.now() >= deadline {
                return Err(FrameError::ShortRead {
                    expected,
                    got: self.carry.len(),
                });
            }
            self.read_chunk(deadline)?;
            if self.cancelled() {
                return Err(FrameError::Cancelled);
            }
        }
        Ok(self.carry.drain(..expected).collect())
    }

    /// The line right after the payload must start with `END_IMAGE`.
    ///
    /// Stricter than scanning ahead for the marker: any line in between, or
    /// bytes before the marker, means the camera sent more than `W*H` bytes,
    /// so the frame is reported as an overrun instead of being accepted.
    fn expect_end(&mut self) -> Result<(), FrameError> {
        let deadline = self.clock.deadline_after(self.cfg.marker_timeout());
        match self.read_line(deadline, LineOverflow::Fail)? {
            Some(line) if line.starts_with(END_MARKER) => Ok(()),
            Some(_) => Err(FrameError::Overrun),
            None => Err(FrameError::FramingTimeout),
        }
    }

    fn try_read_frame(&mut self) -> Result<Frame, FrameError> {
        self.sync_start()?;
        let payload = self.read_payload()?;
        self.expect_end()?;
        Frame::new(self.cfg.width, self.cfg.height, payload).ok_or(FrameError::ShortRead {
            expected: self.cfg.frame_len(),
            got: 0,
        })
    }

    fn recover(&mut self, err: &FrameError) {
        self.stats.record(err);
        self.carry.clear();
        if let Err(e) = clear_source(&mut self.source) {
            tracing::warn!(error = %e, "failed to clear pending input");
        }
    }
}

impl<S: ByteSource, C: Clock> FrameReader for ExactFrameReader<S, C> {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        match self.try_read_frame() {
            Ok(frame) => {
                self.stats.frames += 1;
                Ok(Some(frame))
            }
            Err(FrameError::Cancelled) => Err(FrameError::Cancelled),
            Err(err) => {
                tracing::debug!(error = %err, "exact read failed; input cleared");
                self.recover(&err);
                Err(err)
            }
        }
    }

    fn stats(&self) -> DecoderStats {
        self.stats
    }

    fn clear_input(&mut self) -> Result<(), FrameError> {
        self.carry.clear();
        clear_source(&mut self.source)
    }

    fn attach_cancel(&mut self, flag: Arc<AtomicBool>) {
        self.cancel = Some(flag);
    }
}
