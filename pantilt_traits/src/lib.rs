pub mod clock;
pub mod frame;

pub use clock::{Clock, MonotonicClock};
pub use frame::{BBox, Detection, Frame};

/// Inbound byte stream from the camera side of the link.
pub trait ByteSource {
    /// Read up to `buf.len()` bytes, waiting at most `timeout`.
    /// `Ok(0)` means the timeout elapsed with nothing to read.
    fn read(
        &mut self,
        buf: &mut [u8],
        timeout: std::time::Duration,
    ) -> Result<usize, Box<dyn std::error::Error + Send + Sync>>;

    /// Drop whatever input is pending on the link.
    fn clear_input(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Outbound command channel to the servo controller.
pub trait CommandSink {
    fn send(&mut self, bytes: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Host-supplied object detector. Returning `None` is the "lost target" signal.
pub trait Detector {
    fn detect(&mut self, frame: &Frame) -> Option<Detection>;
}

impl<T: ByteSource + ?Sized> ByteSource for Box<T> {
    fn read(
        &mut self,
        buf: &mut [u8],
        timeout: std::time::Duration,
    ) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read(buf, timeout)
    }

    fn clear_input(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).clear_input()
    }
}

impl<T: CommandSink + ?Sized> CommandSink for Box<T> {
    fn send(&mut self, bytes: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).send(bytes)
    }
}

impl<T: Detector + ?Sized> Detector for Box<T> {
    fn detect(&mut self, frame: &Frame) -> Option<Detection> {
        (**self).detect(frame)
    }
}
