//! Test and helper mocks for pantilt_core

use std::collections::VecDeque;
use std::error::Error;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use pantilt_traits::clock::Clock;
use pantilt_traits::{ByteSource, CommandSink, Detection, Detector, Frame};

use crate::decoder::{END_MARKER, START_MARKER};

type BoxError = Box<dyn Error + Send + Sync>;

/// `START_IMAGE\r\n` + payload + `END_IMAGE\r\n`, as the camera sends it.
pub fn framed(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 32);
    out.extend_from_slice(START_MARKER);
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(payload);
    out.extend_from_slice(END_MARKER);
    out.extend_from_slice(b"\r\n");
    out
}

/// A detector that never finds anything.
pub struct NullDetector;

impl Detector for NullDetector {
    fn detect(&mut self, _frame: &Frame) -> Option<Detection> {
        None
    }
}

/// A detector that reports the same result for every frame.
pub struct FixedDetector(pub Option<Detection>);

impl Detector for FixedDetector {
    fn detect(&mut self, _frame: &Frame) -> Option<Detection> {
        self.0
    }
}

/// Replays scripted chunks, one (possibly partial) chunk per read.
///
/// An empty chunk, or an exhausted script, makes the read "wait" the full
/// timeout on the given clock and return `Ok(0)`; with a `TestClock` that
/// advances time without blocking. Chunks model future arrivals, so `clear_input` drops nothing and
/// only counts calls.
pub struct ChunkedSource<C> {
    chunks: VecDeque<Vec<u8>>,
    clock: C,
    clears: Arc<Mutex<usize>>,
}

impl<C: Clock> ChunkedSource<C> {
    pub fn new<I: IntoIterator<Item = Vec<u8>>>(chunks: I, clock: C) -> Self {
        Self {
            chunks: chunks.into_iter().collect(),
            clock,
            clears: Arc::new(Mutex::new(0)),
        }
    }

    pub fn push(&mut self, chunk: Vec<u8>) {
        self.chunks.push_back(chunk);
    }

    /// Queue `n` reads that time out.
    pub fn push_gaps(&mut self, n: usize) {
        self.chunks.extend(std::iter::repeat_n(Vec::new(), n));
    }

    /// Shared counter of `clear_input` calls.
    pub fn clears(&self) -> Arc<Mutex<usize>> {
        self.clears.clone()
    }
}

impl<C: Clock> ByteSource for ChunkedSource<C> {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, BoxError> {
        let Some(mut chunk) = self.chunks.pop_front().filter(|c| !c.is_empty()) else {
            self.clock.sleep(timeout);
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            chunk.drain(..n);
            self.chunks.push_front(chunk);
        }
        Ok(n)
    }

    fn clear_input(&mut self) -> Result<(), BoxError> {
        *self.clears.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}

/// A source that always fails, like an unplugged port.
pub struct FailingSource;

impl ByteSource for FailingSource {
    fn read(&mut self, _buf: &mut [u8], timeout: Duration) -> Result<usize, BoxError> {
        std::thread::sleep(timeout.min(Duration::from_millis(5)));
        Err(Box::new(std::io::Error::other("device disconnected")))
    }

    fn clear_input(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Records every command it is sent.
#[derive(Clone, Default)]
pub struct SpySink {
    sent: Arc<Mutex<Vec<String>>>,
}

impl SpySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CommandSink for SpySink {
    fn send(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(String::from_utf8_lossy(bytes).into_owned());
        Ok(())
    }
}

/// Fails the first `fail_first` writes, then succeeds. `u32::MAX` never
/// succeeds.
pub struct FlakySink {
    pub fail_first: u32,
    pub attempts: u32,
}

impl FlakySink {
    pub fn failing(n: u32) -> Self {
        Self {
            fail_first: n,
            attempts: 0,
        }
    }
}

impl CommandSink for FlakySink {
    fn send(&mut self, _bytes: &[u8]) -> Result<(), BoxError> {
        self.attempts = self.attempts.saturating_add(1);
        if self.attempts <= self.fail_first {
            return Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "servo link write failed",
            )));
        }
        Ok(())
    }
}
