//! Proportional pan/tilt control.
//!
//! `step_from_err` is a pure function of its inputs; the angles it moves live
//! in `ControllerState`, owned by the control loop.

use crate::config::{AxisCfg, AxisMode, ControlCfg};
use crate::smoothing::Point;

pub const MIN_ANGLE_DEG: f32 = 0.0;
pub const MAX_ANGLE_DEG: f32 = 180.0;

/// Angular correction for one axis.
///
/// Errors within `±deadband_px` produce no motion. Outside the deadband the
/// error is normalized by `half_extent_px`, scaled by `gain`, and clamped to
/// `±max_step_deg`.
pub fn step_from_err(
    error_px: f32,
    half_extent_px: f32,
    gain: f32,
    max_step_deg: f32,
    deadband_px: f32,
) -> f32 {
    if !error_px.is_finite() || error_px.abs() <= deadband_px || half_extent_px <= 0.0 {
        return 0.0;
    }
    let limit = max_step_deg.abs();
    (gain * (error_px / half_extent_px)).clamp(-limit, limit)
}

fn clamp_angle(deg: f32) -> f32 {
    deg.clamp(MIN_ANGLE_DEG, MAX_ANGLE_DEG)
}

/// Servo angles; always within `[0, 180]`. `tilt_deg` is `None` on a
/// single-axis rig.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerState {
    pub pan_deg: f32,
    pub tilt_deg: Option<f32>,
}

impl ControllerState {
    pub fn home(cfg: &ControlCfg) -> Self {
        Self {
            pan_deg: clamp_angle(cfg.pan.home_deg),
            tilt_deg: match cfg.axes {
                AxisMode::Single => None,
                AxisMode::Dual => Some(clamp_angle(cfg.tilt.home_deg)),
            },
        }
    }

    /// Apply signed steps, keeping each axis in range.
    pub fn apply(&mut self, pan_delta: f32, tilt_delta: f32) {
        self.pan_deg = clamp_angle(self.pan_deg + pan_delta);
        if let Some(tilt) = self.tilt_deg.as_mut() {
            *tilt = clamp_angle(*tilt + tilt_delta);
        }
    }
}

fn axis_step(axis: &AxisCfg, error_px: f32, half_extent_px: f32) -> f32 {
    let step = step_from_err(
        error_px,
        half_extent_px,
        axis.gain,
        axis.max_step_deg,
        axis.deadband_px,
    );
    if axis.invert { -step } else { step }
}

/// Steps for a target at `center` relative to the frame reference `reference`.
#[allow(clippy::cast_precision_loss)]
pub fn steps_toward(cfg: &ControlCfg, center: Point, reference: Point) -> (f32, f32) {
    let pan = axis_step(
        &cfg.pan,
        (center.x - reference.x) as f32,
        reference.x as f32,
    );
    let tilt = match cfg.axes {
        AxisMode::Single => 0.0,
        AxisMode::Dual => axis_step(
            &cfg.tilt,
            (center.y - reference.y) as f32,
            reference.y as f32,
        ),
    };
    (pan, tilt)
}
