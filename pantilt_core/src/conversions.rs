//! `From` implementations bridging `pantilt_config` types to `pantilt_core` types.

use crate::config::{AxisCfg, AxisMode, CommandCfg, ControlCfg, DecoderCfg, TrackingCfg};
use crate::runner::{DecoderKind, RunMode, RunParams};

// ── DecoderCfg ───────────────────────────────────────────────────────────────

impl From<&pantilt_config::FrameCfg> for DecoderCfg {
    fn from(c: &pantilt_config::FrameCfg) -> Self {
        Self {
            width: c.width,
            height: c.height,
            marker_timeout_ms: c.marker_timeout_ms,
            payload_timeout_ms: c.payload_timeout_ms,
            poll_timeout_ms: c.poll_timeout_ms,
        }
    }
}

// ── ControlCfg ───────────────────────────────────────────────────────────────

impl From<pantilt_config::Axes> for AxisMode {
    fn from(a: pantilt_config::Axes) -> Self {
        match a {
            pantilt_config::Axes::Single => Self::Single,
            pantilt_config::Axes::Dual => Self::Dual,
        }
    }
}

impl From<&pantilt_config::ControlCfg> for ControlCfg {
    fn from(c: &pantilt_config::ControlCfg) -> Self {
        Self {
            axes: c.axes.into(),
            pan: AxisCfg {
                gain: c.gain_pan,
                max_step_deg: c.max_step_deg,
                deadband_px: c.deadband_px,
                home_deg: c.home_pan_deg,
                invert: c.invert_pan,
            },
            tilt: AxisCfg {
                gain: c.gain_tilt,
                max_step_deg: c.max_step_deg,
                deadband_px: c.deadband_px,
                home_deg: c.home_tilt_deg,
                invert: c.invert_tilt,
            },
        }
    }
}

// ── CommandCfg ───────────────────────────────────────────────────────────────

impl From<&pantilt_config::CommandCfg> for CommandCfg {
    fn from(c: &pantilt_config::CommandCfg) -> Self {
        Self {
            send_interval_ms: c.send_interval_ms,
            max_write_failures: c.max_write_failures,
        }
    }
}

// ── Whole config ─────────────────────────────────────────────────────────────

impl From<&pantilt_config::Config> for TrackingCfg {
    fn from(c: &pantilt_config::Config) -> Self {
        Self {
            smoothing_alpha: c.smoothing.alpha,
            control: (&c.control).into(),
            command: (&c.command).into(),
        }
    }
}

impl From<&pantilt_config::Config> for RunParams {
    fn from(c: &pantilt_config::Config) -> Self {
        Self {
            decoder: (&c.frame).into(),
            tracking: c.into(),
            mode: match c.runner.mode {
                pantilt_config::RunMode::Threaded => RunMode::Threaded,
                pantilt_config::RunMode::Cooperative => RunMode::Cooperative,
            },
            decoder_kind: match c.runner.decoder {
                pantilt_config::DecoderMode::Stream => DecoderKind::Stream,
                pantilt_config::DecoderMode::Exact => DecoderKind::Exact,
            },
            settle_ms: c.serial.settle_ms,
            max_frames: None,
        }
    }
}
