//! One control cycle per frame: detect, smooth, control, maybe send.

use std::time::Instant;

use pantilt_traits::{CommandSink, Detector, Frame};

use crate::command::{CommandEncoder, SendOutcome};
use crate::config::TrackingCfg;
use crate::controller::{ControllerState, steps_toward};
use crate::error::{BuildError, TrackerError};
use crate::smoothing::{Point, SmoothingState, TrackResult, smooth};

/// What happened during one call to [`TrackingLoop::process`].
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub track: TrackResult,
    pub smoothed: Option<Point>,
    pub pan_delta: f32,
    pub tilt_delta: f32,
    pub angles: ControllerState,
    pub outcome: SendOutcome,
}

impl CycleReport {
    pub fn sent(&self) -> Option<&str> {
        match &self.outcome {
            SendOutcome::Sent(cmd) => Some(cmd),
            _ => None,
        }
    }
}

/// Owns the per-cycle state (`SmoothingState`, `ControllerState`, the send
/// throttle). Nothing here is shared with the receiver thread.
#[derive(Debug)]
pub struct TrackingLoop {
    cfg: TrackingCfg,
    smoothing: SmoothingState,
    angles: ControllerState,
    encoder: CommandEncoder,
}

impl TrackingLoop {
    pub fn try_new(cfg: TrackingCfg) -> Result<Self, BuildError> {
        let alpha = cfg.smoothing_alpha;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(BuildError::InvalidConfig("smoothing_alpha must be in (0, 1]"));
        }
        for axis in [&cfg.control.pan, &cfg.control.tilt] {
            if !(axis.gain.is_finite() && axis.gain > 0.0) {
                return Err(BuildError::InvalidConfig("gain must be > 0"));
            }
            if !(axis.max_step_deg.is_finite() && axis.max_step_deg >= 0.0) {
                return Err(BuildError::InvalidConfig("max_step_deg must be >= 0"));
            }
            if !(axis.deadband_px.is_finite() && axis.deadband_px >= 0.0) {
                return Err(BuildError::InvalidConfig("deadband_px must be >= 0"));
            }
        }
        Ok(Self {
            angles: ControllerState::home(&cfg.control),
            encoder: CommandEncoder::new(cfg.command.send_interval()),
            smoothing: SmoothingState::default(),
            cfg,
        })
    }

    pub fn angles(&self) -> ControllerState {
        self.angles
    }

    pub fn smoothing(&self) -> SmoothingState {
        self.smoothing
    }

    pub fn encoder(&self) -> &CommandEncoder {
        &self.encoder
    }

    /// Run one cycle on `frame`.
    ///
    /// Angles move only when the detector finds a target; a lost target
    /// clears the smoothing history and holds the servos where they are.
    /// The current angles are still offered to the encoder every cycle, so
    /// the first command goes out even before anything is found.
    pub fn process<D, K>(
        &mut self,
        frame: &Frame,
        detector: &mut D,
        sink: &mut K,
        now: Instant,
    ) -> Result<CycleReport, TrackerError>
    where
        D: Detector + ?Sized,
        K: CommandSink + ?Sized,
    {
        let (w, h) = (frame.width(), frame.height());
        let detection = detector.detect(frame);
        let track = TrackResult::from_detection(detection.as_ref(), w, h);
        let smoothed = smooth(&track, &mut self.smoothing, self.cfg.smoothing_alpha);

        let (mut pan_delta, mut tilt_delta) = (0.0, 0.0);
        if let Some(center) = smoothed {
            let reference = Point::new(
                i32::try_from(w / 2).unwrap_or(i32::MAX),
                i32::try_from(h / 2).unwrap_or(i32::MAX),
            );
            (pan_delta, tilt_delta) = steps_toward(&self.cfg.control, center, reference);
            self.angles.apply(pan_delta, tilt_delta);
        }
        tracing::trace!(
            found = track.found(),
            ?smoothed,
            pan = self.angles.pan_deg,
            tilt = ?self.angles.tilt_deg,
            "cycle"
        );

        let outcome = self.encoder.maybe_send(&self.angles, sink, now)?;
        Ok(CycleReport {
            track,
            smoothed,
            pan_delta,
            tilt_delta,
            angles: self.angles,
            outcome,
        })
    }
}
