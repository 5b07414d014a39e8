use thiserror::Error;

/// Why an in-flight frame was dropped. Handled inside the decoding path:
/// the frame is discarded, the decoder resynchronizes, and the host may count
/// or log the reason.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("timeout waiting for frame marker")]
    FramingTimeout,
    #[error("short read: expected {expected} payload bytes, got {got}")]
    ShortRead { expected: usize, got: usize },
    #[error("payload overran the frame before END_IMAGE")]
    Overrun,
    #[error("byte source error: {0}")]
    Source(String),
    #[error("stopped while waiting for a frame")]
    Cancelled,
}

#[derive(Debug, Error, Clone)]
pub enum TrackerError {
    #[error("transport write failed: {0}")]
    TransportWrite(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("byte source error: {0}")]
    Source(String),
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
