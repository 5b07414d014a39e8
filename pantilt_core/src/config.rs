//! Configuration types for the tracking core.
//!
//! These are the runtime configuration structs used by the decoder, the
//! tracking loop and the runner. They are separate from the TOML-deserialized
//! config in `pantilt_config`.

use std::time::Duration;

/// Frame geometry and framing timeouts.
#[derive(Debug, Clone)]
pub struct DecoderCfg {
    pub width: usize,
    pub height: usize,
    /// Max wait for a marker line, and the bound on an unfinished capture.
    pub marker_timeout_ms: u64,
    /// Max wait for the raw payload (exact-read mode).
    pub payload_timeout_ms: u64,
    /// Per-read timeout; bounds how long any single read blocks.
    pub poll_timeout_ms: u64,
}

impl DecoderCfg {
    pub fn frame_len(&self) -> usize {
        self.width * self.height
    }

    pub fn marker_timeout(&self) -> Duration {
        Duration::from_millis(self.marker_timeout_ms)
    }

    pub fn payload_timeout(&self) -> Duration {
        Duration::from_millis(self.payload_timeout_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms.max(1))
    }
}

impl Default for DecoderCfg {
    fn default() -> Self {
        Self {
            width: 160,
            height: 120,
            marker_timeout_ms: 2_000,
            payload_timeout_ms: 1_000,
            poll_timeout_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisMode {
    Single,
    Dual,
}

/// Proportional tuning for one servo axis.
#[derive(Debug, Clone, Copy)]
pub struct AxisCfg {
    /// Degrees of correction for an error of half the frame extent.
    pub gain: f32,
    pub max_step_deg: f32,
    pub deadband_px: f32,
    /// Home angle in degrees, used as the initial position.
    pub home_deg: f32,
    /// Flip the correction sign for a mount wired in reverse.
    pub invert: bool,
}

impl Default for AxisCfg {
    fn default() -> Self {
        Self {
            gain: 18.0,
            max_step_deg: 3.0,
            deadband_px: 8.0,
            home_deg: 90.0,
            invert: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControlCfg {
    pub axes: AxisMode,
    pub pan: AxisCfg,
    pub tilt: AxisCfg,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            axes: AxisMode::Dual,
            pan: AxisCfg::default(),
            tilt: AxisCfg::default(),
        }
    }
}

/// Outbound command pacing.
#[derive(Debug, Clone)]
pub struct CommandCfg {
    pub send_interval_ms: u64,
    /// Consecutive write failures tolerated before a run gives up.
    pub max_write_failures: u32,
}

impl CommandCfg {
    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }
}

impl Default for CommandCfg {
    fn default() -> Self {
        Self {
            send_interval_ms: 60,
            max_write_failures: 10,
        }
    }
}

/// Everything the per-frame tracking loop needs.
#[derive(Debug, Clone)]
pub struct TrackingCfg {
    /// EMA weight of the newest center, in (0.0, 1.0].
    pub smoothing_alpha: f32,
    pub control: ControlCfg,
    pub command: CommandCfg,
}

impl Default for TrackingCfg {
    fn default() -> Self {
        Self {
            smoothing_alpha: 0.12,
            control: ControlCfg::default(),
            command: CommandCfg::default(),
        }
    }
}
