//! Outbound servo command formatting and throttling.
//!
//! Wire format (ASCII, newline-terminated, integer degrees in `[0, 180]`):
//! - single axis: `ANG:<deg>\n`
//! - dual axis:   `PT:<pan>,<tilt>\n`

use std::time::{Duration, Instant};

use pantilt_traits::CommandSink;

use crate::controller::{ControllerState, MAX_ANGLE_DEG, MIN_ANGLE_DEG};
use crate::error::TrackerError;
use crate::hw_error::map_sink_error;

/// Nearest whole degree, half away from zero, clamped to the servo range.
#[allow(clippy::cast_possible_truncation)]
pub fn round_deg(deg: f32) -> i32 {
    if deg.is_nan() {
        return 90;
    }
    deg.clamp(MIN_ANGLE_DEG, MAX_ANGLE_DEG).round() as i32
}

pub fn format_command(state: &ControllerState) -> String {
    let pan = round_deg(state.pan_deg);
    match state.tilt_deg {
        None => format!("ANG:{pan}\n"),
        Some(tilt) => format!("PT:{pan},{}\n", round_deg(tilt)),
    }
}

#[derive(Debug, Clone, Default)]
pub struct SendThrottle {
    pub last_sent_command: Option<String>,
    pub last_send_time: Option<Instant>,
}

impl SendThrottle {
    /// Whether `cmd` may go out at `now`: the interval has elapsed since the
    /// last emission and the text differs from what was last sent.
    pub fn permits(&self, cmd: &str, now: Instant, interval: Duration) -> bool {
        self.interval_elapsed(now, interval) && !self.is_repeat(cmd)
    }

    pub fn interval_elapsed(&self, now: Instant, interval: Duration) -> bool {
        self.last_send_time
            .is_none_or(|t| now.saturating_duration_since(t) >= interval)
    }

    pub fn is_repeat(&self, cmd: &str) -> bool {
        self.last_sent_command.as_deref() == Some(cmd)
    }

    pub fn record(&mut self, cmd: String, now: Instant) {
        self.last_sent_command = Some(cmd);
        self.last_send_time = Some(now);
    }
}

/// What one call to [`CommandEncoder::maybe_send`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent(String),
    Throttled,
    Unchanged,
}

#[derive(Debug)]
pub struct CommandEncoder {
    interval: Duration,
    throttle: SendThrottle,
}

impl CommandEncoder {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            throttle: SendThrottle::default(),
        }
    }

    pub fn throttle(&self) -> &SendThrottle {
        &self.throttle
    }

    /// Format `state` and write it if the throttle allows.
    ///
    /// The throttle is updated before the write, so a failed write is not
    /// retried on the next cycle unless the command changes.
    pub fn maybe_send<K: CommandSink + ?Sized>(
        &mut self,
        state: &ControllerState,
        sink: &mut K,
        now: Instant,
    ) -> Result<SendOutcome, TrackerError> {
        let cmd = format_command(state);
        if !self.throttle.interval_elapsed(now, self.interval) {
            return Ok(SendOutcome::Throttled);
        }
        if self.throttle.is_repeat(&cmd) {
            return Ok(SendOutcome::Unchanged);
        }

        self.throttle.record(cmd.clone(), now);
        sink.send(cmd.as_bytes()).map_err(|e| map_sink_error(&*e))?;
        tracing::debug!(command = cmd.trim_end(), "command sent");
        Ok(SendOutcome::Sent(cmd))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(90.0, Some(90.0), "PT:90,90\n")]
    #[case(92.5, Some(87.49), "PT:93,87\n")]
    #[case(-4.0, Some(200.0), "PT:0,180\n")]
    #[case(45.6, None, "ANG:46\n")]
    fn command_text(#[case] pan: f32, #[case] tilt: Option<f32>, #[case] expected: &str) {
        let st = ControllerState {
            pan_deg: pan,
            tilt_deg: tilt,
        };
        assert_eq!(format_command(&st), expected);
    }

    #[test]
    fn throttle_requires_interval_and_change() {
        let t0 = Instant::now();
        let iv = Duration::from_millis(60);
        let mut th = SendThrottle::default();
        assert!(th.permits("ANG:90\n", t0, iv));
        th.record("ANG:90\n".into(), t0);
        assert!(!th.permits("ANG:91\n", t0 + Duration::from_millis(59), iv));
        assert!(!th.permits("ANG:90\n", t0 + Duration::from_millis(500), iv));
        assert!(th.permits("ANG:91\n", t0 + Duration::from_millis(60), iv));
    }
}
