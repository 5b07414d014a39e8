//! Simulated camera and servo link for running without hardware.
//!
//! `SimulatedCamera` speaks the same wire protocol as the camera firmware:
//! a `Start!` boot banner, then `START_IMAGE\r\n`, `W*H` raw bytes,
//! `END_IMAGE\r\n` per frame, with a bright square bouncing across a dark
//! background.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use pantilt_traits::{ByteSource, CommandSink};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub const BACKGROUND: u8 = 20;
pub const TARGET: u8 = 230;
pub const TARGET_SIZE: usize = 12;

/// Triangle wave over `[0, span]`.
fn bounce(step: usize, span: usize) -> usize {
    if span == 0 {
        return 0;
    }
    let p = step % (2 * span);
    if p <= span { p } else { 2 * span - p }
}

pub struct SimulatedCamera {
    width: usize,
    height: usize,
    pending: VecDeque<u8>,
    frame_no: usize,
    interval: Duration,
    next_frame_at: Instant,
    truncate_every: Option<usize>,
    booted: bool,
}

impl SimulatedCamera {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            pending: VecDeque::new(),
            frame_no: 0,
            interval: Duration::ZERO,
            next_frame_at: Instant::now(),
            truncate_every: None,
            booted: false,
        }
    }

    /// Pace frames like a real sensor (e.g. 100 ms for ~10 fps).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Drop bytes from every `n`th frame, as a lossy link would.
    pub fn with_truncation_every(mut self, n: usize) -> Self {
        self.truncate_every = (n > 0).then_some(n);
        self
    }

    pub fn frames_sent(&self) -> usize {
        self.frame_no
    }

    /// Top-left corner of the target square in frame `n`.
    pub fn target_at(&self, n: usize) -> (usize, usize) {
        let size = TARGET_SIZE.min(self.width).min(self.height);
        (
            bounce(n * 3, self.width - size),
            bounce(n * 2, self.height - size),
        )
    }

    pub fn render(&self, n: usize) -> Vec<u8> {
        let mut px = vec![BACKGROUND; self.width * self.height];
        let size = TARGET_SIZE.min(self.width).min(self.height);
        let (tx, ty) = self.target_at(n);
        for row in px.chunks_mut(self.width).skip(ty).take(size) {
            row[tx..tx + size].fill(TARGET);
        }
        px
    }

    fn emit_frame(&mut self) {
        if !self.booted {
            self.pending.extend(b"Start!\r\n");
            self.booted = true;
        }
        let n = self.frame_no;
        let mut payload = self.render(n);
        if self.truncate_every.is_some_and(|k| n % k == k - 1) {
            payload.truncate(payload.len() - self.width.div_ceil(2));
            tracing::trace!(frame = n, "simulated camera truncating frame");
        }
        if n % 10 == 0 {
            self.pending.extend(format!("fps={}\r\n", 10).as_bytes());
        }
        self.pending.extend(b"START_IMAGE\r\n");
        self.pending.extend(payload);
        self.pending.extend(b"END_IMAGE\r\n");
        self.frame_no += 1;
        self.next_frame_at = self.next_frame_at.max(Instant::now()) + self.interval;
    }
}

impl ByteSource for SimulatedCamera {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, BoxError> {
        if self.pending.is_empty() {
            let now = Instant::now();
            if now < self.next_frame_at {
                let wait = self.next_frame_at - now;
                std::thread::sleep(wait.min(timeout));
                if wait > timeout {
                    return Ok(0);
                }
            }
            self.emit_frame();
        }
        let n = buf.len().min(self.pending.len());
        for (dst, src) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn clear_input(&mut self) -> Result<(), BoxError> {
        self.pending.clear();
        Ok(())
    }
}

/// Sink that keeps every command, trimmed of its newline.
#[derive(Clone, Default)]
pub struct RecordingSink {
    commands: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CommandSink for RecordingSink {
    fn send(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        let text = std::str::from_utf8(bytes)?.trim_end().to_string();
        tracing::info!(command = %text, "servo (simulated)");
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text);
        Ok(())
    }
}
