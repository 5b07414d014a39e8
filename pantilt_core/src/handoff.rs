//! Latest-frame handoff between the receiver thread and the control loop.
//!
//! The slot owns one frame. The producer copies a completed frame in and the
//! consumer copies one out, each under a lock held only for the O(W*H) copy;
//! no lock is held while decoding or detecting. A sequence number tells the
//! consumer whether the copy it gets is newer than the last one it saw.

use std::sync::{Mutex, MutexGuard, PoisonError};

use pantilt_traits::Frame;

/// Pixel value of the placeholder returned before the first publish.
pub const PLACEHOLDER_VALUE: u8 = 255;

struct Published {
    /// 0 until the first publish.
    seq: u64,
    frame: Frame,
}

pub struct FrameSlot {
    inner: Mutex<Published>,
}

impl FrameSlot {
    /// A slot holding an all-white `width × height` placeholder.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            inner: Mutex::new(Published {
                seq: 0,
                frame: Frame::filled(width.max(1), height.max(1), PLACEHOLDER_VALUE),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Published> {
        // A panic mid-copy cannot leave a torn frame visible: both copies
        // replace the whole buffer, so the data behind a poisoned lock is
        // still a complete frame.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy `frame` in and return its sequence number.
    pub fn publish(&self, frame: &Frame) -> u64 {
        let mut slot = self.lock();
        slot.frame.copy_from(frame);
        slot.seq += 1;
        slot.seq
    }

    /// Copy of the newest frame (the placeholder before any publish).
    pub fn latest(&self) -> Frame {
        self.lock().frame.clone()
    }

    /// Copy of the newest frame if it is newer than `seen`.
    pub fn latest_since(&self, seen: u64) -> Option<(u64, Frame)> {
        let slot = self.lock();
        (slot.seq > seen).then(|| (slot.seq, slot.frame.clone()))
    }

    /// Number of frames published so far.
    pub fn sequence(&self) -> u64 {
        self.lock().seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn placeholder_is_white_before_first_publish() {
        let slot = FrameSlot::new(4, 3);
        let f = slot.latest();
        assert_eq!((f.width(), f.height()), (4, 3));
        assert!(f.pixels().iter().all(|&p| p == PLACEHOLDER_VALUE));
        assert_eq!(slot.sequence(), 0);
        assert!(slot.latest_since(0).is_none());
    }

    #[test]
    fn latest_since_reports_each_frame_once() {
        let slot = FrameSlot::new(2, 1);
        let a = Frame::new(2, 1, vec![1, 2]).unwrap();
        let seq = slot.publish(&a);
        let (seen, got) = slot.latest_since(0).expect("new frame");
        assert_eq!(seen, seq);
        assert_eq!(got, a);
        assert!(slot.latest_since(seen).is_none());
        // Still readable as a snapshot.
        assert_eq!(slot.latest(), a);
    }

    #[test]
    fn concurrent_readers_never_see_a_torn_frame() {
        let slot = Arc::new(FrameSlot::new(64, 64));
        let writer = {
            let slot = slot.clone();
            std::thread::spawn(move || {
                for v in 0..200u8 {
                    slot.publish(&Frame::filled(64, 64, v));
                }
            })
        };
        for _ in 0..200 {
            let f = slot.latest();
            let first = f.pixels()[0];
            assert!(f.pixels().iter().all(|&p| p == first));
        }
        writer.join().unwrap();
        assert_eq!(slot.sequence(), 200);
    }
}
