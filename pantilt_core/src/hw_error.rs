//! Maps `Box<dyn Error>` from trait boundaries to typed errors.
//!
//! The traits in `pantilt_traits` use `Box<dyn Error + Send + Sync>` for maximum
//! flexibility; this module converts those to our typed enums, with an
//! optional feature-gated path for `pantilt_hardware::HwError` downcasting.

use crate::error::{FrameError, TrackerError};

/// Map a byte-source failure to a `FrameError`.
///
/// A timeout reported as an error (rather than `Ok(0)`) counts as a framing
/// timeout; anything else is a source fault.
pub fn map_source_error(e: &(dyn std::error::Error + 'static)) -> FrameError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<pantilt_hardware::error::HwError>() {
            return match hw {
                pantilt_hardware::error::HwError::Timeout => FrameError::FramingTimeout,
                other => FrameError::Source(other.to_string()),
            };
        }
    }

    if let Some(io) = e.downcast_ref::<std::io::Error>()
        && io.kind() == std::io::ErrorKind::TimedOut
    {
        return FrameError::FramingTimeout;
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timed out") || s.to_lowercase().contains("timeout") {
        FrameError::FramingTimeout
    } else {
        FrameError::Source(s)
    }
}

/// Map a command-sink failure to `TrackerError::TransportWrite`.
pub fn map_sink_error(e: &(dyn std::error::Error + 'static)) -> TrackerError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<pantilt_hardware::error::HwError>() {
            return TrackerError::TransportWrite(hw.to_string());
        }
    }
    TrackerError::TransportWrite(e.to_string())
}
