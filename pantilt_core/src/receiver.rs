//! Background frame reception.
//!
//! Spawns a thread that owns a `FrameReader`, publishes each completed frame
//! into a shared `FrameSlot`, and nudges the consumer over a bounded channel.
//!
//! Each `FrameReceiver` owns exactly one thread, stopped and joined when the
//! receiver is dropped. The thread never blocks longer than one bounded read
//! before it sees the stop flag.
use crossbeam_channel as xch;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use pantilt_traits::Frame;

use crate::decoder::DecoderStats;
use crate::error::FrameError;
use crate::handoff::FrameSlot;
use crate::reader::FrameReader;

/// Pause after a link error so a dead port does not spin the thread.
const SOURCE_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Consecutive drops between `warn` reports.
const DROP_BURST: u32 = 10;

/// Run of consecutive dropped frames. Each drop logs at `debug`; every
/// `DROP_BURST`-th drop in a row also logs at `warn`.
#[derive(Debug, Default)]
pub(crate) struct DropStreak {
    count: u32,
}

impl DropStreak {
    pub(crate) fn note(&mut self, err: &FrameError) {
        self.count = self.count.saturating_add(1);
        if let FrameError::Source(msg) = err {
            tracing::warn!(error = %msg, "camera link error");
            std::thread::sleep(SOURCE_ERROR_BACKOFF);
        } else {
            tracing::debug!(error = %err, "frame dropped");
        }
        if self.count % DROP_BURST == 0 {
            tracing::warn!(consecutive = self.count, last = %err, "frames keep failing to decode");
        }
    }

    pub(crate) fn clear(&mut self) {
        self.count = 0;
    }
}

pub struct FrameReceiver {
    slot: Arc<FrameSlot>,
    /// Carries the sequence number of each publish; capacity 1, newest wins.
    rx: xch::Receiver<u64>,
    stats: Arc<Mutex<DecoderStats>>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl FrameReceiver {
    pub fn spawn<R: FrameReader + Send + 'static>(mut reader: R, slot: Arc<FrameSlot>) -> Self {
        let (tx, rx) = xch::bounded(1);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let stats = Arc::new(Mutex::new(reader.stats()));
        let stats_clone = stats.clone();
        let slot_clone = slot.clone();
        reader.attach_cancel(shutdown.clone());

        let join_handle = std::thread::spawn(move || {
            let mut streak = DropStreak::default();
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("receiver thread received shutdown signal");
                    break;
                }

                let result = reader.next_frame();
                *stats_clone.lock().unwrap_or_else(PoisonError::into_inner) = reader.stats();

                match result {
                    Ok(Some(frame)) => {
                        streak.clear();
                        let seq = slot_clone.publish(&frame);
                        tracing::trace!(seq, "frame published");
                        // A full channel already holds a wakeup; the slot has the newest frame.
                        if let Err(xch::TrySendError::Disconnected(_)) = tx.try_send(seq) {
                            tracing::debug!("receiver consumer disconnected, exiting thread");
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(FrameError::Cancelled) => break,
                    Err(err) => streak.note(&err),
                }
            }
            tracing::trace!("receiver thread exiting cleanly");
        });

        Self {
            slot,
            rx,
            stats,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    pub fn slot(&self) -> &Arc<FrameSlot> {
        &self.slot
    }

    /// Copy of the most recent frame; the placeholder until one arrives.
    pub fn latest(&self) -> Frame {
        self.slot.latest()
    }

    /// Wait up to `timeout` for a frame newer than sequence `seen`.
    pub fn wait_frame(&self, seen: u64, timeout: Duration) -> Option<(u64, Frame)> {
        if let Some(newer) = self.slot.latest_since(seen) {
            return Some(newer);
        }
        match self.rx.recv_timeout(timeout) {
            Ok(_) => self.slot.latest_since(seen),
            Err(_) => None,
        }
    }

    /// Decoder counters as of the reader's last call.
    pub fn stats(&self) -> DecoderStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for FrameReceiver {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // The thread exits after its current bounded read completes.
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("receiver thread joined"),
                Err(e) => tracing::warn!(?e, "receiver thread panicked during shutdown"),
            }
        }
    }
}
