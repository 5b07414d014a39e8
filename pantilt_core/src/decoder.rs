//! Byte-oriented frame decoder for the marker-delimited camera stream.
//!
//! Wire format: `START_IMAGE\n`, then exactly `W*H` raw grayscale bytes,
//! then `END_IMAGE\n`. Marker lines are matched by substring so surrounding
//! telemetry on the same line is tolerated. `Start!` is the camera's boot
//! banner and forces a resync.
//!
//! The payload is arbitrary binary data, so marker lines are only looked for
//! while no payload is expected: once `START_IMAGE` is seen the next `W*H`
//! bytes are copied raw into the scratch buffer, and only the bytes after
//! them are scanned for `END_IMAGE`.

use crate::error::FrameError;
use pantilt_traits::Frame;

pub const START_MARKER: &[u8] = b"START_IMAGE";
pub const END_MARKER: &[u8] = b"END_IMAGE";
pub const RESET_MARKER: &[u8] = b"Start!";

/// Longest marker line kept while scanning; older bytes are dropped.
const MAX_LINE_BYTES: usize = 256;

#[inline]
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[inline]
pub(crate) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    Idle,
    /// Next payload byte lands at `scratch[cursor_y][cursor_x]`.
    /// `(0, H)` means the payload is complete and a trailer is expected.
    Capturing { cursor_x: usize, cursor_y: usize },
}

/// Running counters for dropped and completed frames.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecoderStats {
    pub frames: u64,
    pub overruns: u64,
    pub short_reads: u64,
    pub timeouts: u64,
    pub resets: u64,
}

impl DecoderStats {
    /// Count one dropped frame under its reason.
    pub fn record(&mut self, err: &FrameError) {
        match err {
            FrameError::FramingTimeout => self.timeouts += 1,
            FrameError::ShortRead { .. } => self.short_reads += 1,
            FrameError::Overrun => self.overruns += 1,
            FrameError::Source(_) | FrameError::Cancelled => {}
        }
    }

    /// Frames discarded for any framing reason.
    pub fn dropped(&self) -> u64 {
        self.overruns + self.short_reads + self.timeouts
    }
}

pub struct FrameDecoder {
    width: usize,
    height: usize,
    state: DecoderState,
    scratch: Vec<u8>,
    /// Set once the in-flight frame is known to be bad; it will be discarded
    /// at the next marker.
    invalid: bool,
    line: Vec<u8>,
    stats: DecoderStats,
    /// Bumped on every `START_IMAGE`, including one that cuts short an
    /// invalid frame.
    captures: u64,
}

impl FrameDecoder {
    /// Create a decoder for `width × height` frames. Dimensions of zero are
    /// bumped to one so the decoder is always constructible.
    pub fn new(width: usize, height: usize) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            state: DecoderState::Idle,
            scratch: vec![0; width * height],
            invalid: false,
            line: Vec::with_capacity(MAX_LINE_BYTES),
            stats: DecoderStats::default(),
            captures: 0,
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn frame_len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.state, DecoderState::Capturing { .. })
    }

    /// Number of captures opened so far. A change means the capture in
    /// progress is a new one.
    pub fn capture_epoch(&self) -> u64 {
        self.captures
    }

    /// Consume `bytes` and return every frame completed by them, in order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Frame> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            match self.state {
                DecoderState::Idle => {
                    let b = bytes[i];
                    i += 1;
                    self.push_line_byte(b);
                    if b == b'\n' {
                        self.on_idle_line();
                    }
                }
                DecoderState::Capturing { cursor_x, cursor_y } if cursor_y < self.height => {
                    let offset = cursor_y * self.width + cursor_x;
                    let n = (self.frame_len() - offset).min(bytes.len() - i);
                    self.scratch[offset..offset + n].copy_from_slice(&bytes[i..i + n]);
                    i += n;
                    let pos = offset + n;
                    self.state = DecoderState::Capturing {
                        cursor_x: pos % self.width,
                        cursor_y: pos / self.width,
                    };
                }
                DecoderState::Capturing { .. } => {
                    let b = bytes[i];
                    i += 1;
                    self.push_line_byte(b);
                    if b == b'\n'
                        && let Some(frame) = self.on_trailer_line()
                    {
                        out.push(frame);
                    }
                }
            }
        }
        out
    }

    /// Discard any in-flight frame and return to `Idle`.
    /// Returns `true` when a capture was actually abandoned.
    pub fn abandon(&mut self, reason: &FrameError) -> bool {
        let was_capturing = self.is_capturing();
        if was_capturing {
            if !self.invalid {
                self.stats.record(reason);
            }
            tracing::debug!(reason = %reason, state = ?self.state, "frame abandoned");
        }
        self.state = DecoderState::Idle;
        self.invalid = false;
        self.line.clear();
        was_capturing
    }

    fn push_line_byte(&mut self, b: u8) {
        if self.line.len() >= MAX_LINE_BYTES {
            // Keep the tail so a marker split across the cut is still found.
            self.line.drain(..MAX_LINE_BYTES / 2);
            if self.is_capturing() {
                self.mark_overrun();
            }
        }
        self.line.push(b);
    }

    fn mark_overrun(&mut self) {
        if !self.invalid {
            self.invalid = true;
            self.stats.overruns += 1;
            tracing::debug!("payload overrun; waiting for next marker");
        }
    }

    fn begin_capture(&mut self) {
        self.captures += 1;
        self.state = DecoderState::Capturing {
            cursor_x: 0,
            cursor_y: 0,
        };
        self.invalid = false;
        self.line.clear();
    }

    fn on_idle_line(&mut self) {
        let line = std::mem::take(&mut self.line);
        if contains(&line, START_MARKER) {
            tracing::trace!("START_IMAGE");
            self.begin_capture();
        } else if contains(&line, RESET_MARKER) {
            tracing::debug!("camera reset banner; resync");
            self.stats.resets += 1;
            self.state = DecoderState::Idle;
        }
        self.line = line;
        self.line.clear();
    }

    /// A full line arrived after the payload was complete.
    fn on_trailer_line(&mut self) -> Option<Frame> {
        let line = std::mem::take(&mut self.line);
        let mut completed = None;

        if let Some(pos) = find(&line, END_MARKER) {
            // Anything between the payload and the marker means the sender
            // wrote more than W*H bytes.
            if pos > 0 {
                self.mark_overrun();
            }
            if self.invalid {
                tracing::debug!("END_IMAGE after overrun; frame discarded");
            } else {
                self.stats.frames += 1;
                completed = Frame::new(self.width, self.height, self.scratch.clone());
            }
            self.state = DecoderState::Idle;
            self.invalid = false;
        } else if contains(&line, START_MARKER) {
            self.mark_overrun();
            self.begin_capture();
        } else if contains(&line, RESET_MARKER) {
            self.mark_overrun();
            self.stats.resets += 1;
            self.state = DecoderState::Idle;
            self.invalid = false;
        } else {
            self.mark_overrun();
        }

        self.line = line;
        self.line.clear();
        completed
    }
}
