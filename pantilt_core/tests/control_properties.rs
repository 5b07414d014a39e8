use std::time::{Duration, Instant};

use pantilt_core::command::{CommandEncoder, SendOutcome};
use pantilt_core::mocks::SpySink;
use pantilt_core::smoothing::{Point, SmoothingState, TrackResult, smooth};
use pantilt_core::{ControlCfg, ControllerState, step_from_err};
use proptest::prelude::*;

const HALF: f32 = 80.0;
const GAIN: f32 = 18.0;
const MAX_STEP: f32 = 3.0;
const DEADBAND: f32 = 8.0;

fn step(e: f32) -> f32 {
    step_from_err(e, HALF, GAIN, MAX_STEP, DEADBAND)
}

proptest! {
    #[test]
    fn no_motion_inside_deadband(e in -DEADBAND..=DEADBAND) {
        prop_assert_eq!(step(e), 0.0);
    }

    #[test]
    fn far_errors_saturate_with_matching_sign(mag in 14.0f32..10_000.0, neg in any::<bool>()) {
        let e = if neg { -mag } else { mag };
        let d = step(e);
        prop_assert_eq!(d.abs(), MAX_STEP);
        prop_assert_eq!(d.signum(), e.signum());
    }

    #[test]
    fn step_is_monotonic_in_error_magnitude(a in 0.0f32..500.0, b in 0.0f32..500.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(step(lo) <= step(hi));
        prop_assert!(step(-lo) >= step(-hi));
    }

    #[test]
    fn angles_stay_in_range(n in 1usize..200, up in any::<bool>(), start in 0.0f32..=180.0) {
        let mut st = ControllerState { pan_deg: start, tilt_deg: Some(start) };
        let d = if up { MAX_STEP } else { -MAX_STEP };
        for _ in 0..n {
            st.apply(d, d);
            prop_assert!((0.0..=180.0).contains(&st.pan_deg));
            prop_assert!((0.0..=180.0).contains(&st.tilt_deg.unwrap()));
        }
    }

    #[test]
    fn reacquisition_after_loss_is_unbiased(
        px in 0i32..160, py in 0i32..120,
        rx in 0i32..160, ry in 0i32..120,
        alpha in 0.01f32..=1.0,
    ) {
        let mut st = SmoothingState { prev_center: Some(Point::new(px, py)) };
        prop_assert_eq!(smooth(&TrackResult::LOST, &mut st, alpha), None);
        let found = TrackResult { bbox: None, center_raw: Some(Point::new(rx, ry)) };
        prop_assert_eq!(smooth(&found, &mut st, alpha), Some(Point::new(rx, ry)));
    }

    #[test]
    fn encoder_never_repeats_or_exceeds_rate(
        steps in proptest::collection::vec((0u64..150, 85.0f32..95.0), 1..120),
    ) {
        let interval = Duration::from_millis(60);
        let mut enc = CommandEncoder::new(interval);
        let mut sink = SpySink::new();
        let t0 = Instant::now();
        let mut now = t0;
        let mut emitted: Vec<(Instant, String)> = Vec::new();
        for (dt, pan) in steps {
            now += Duration::from_millis(dt);
            let st = ControllerState { pan_deg: pan, tilt_deg: Some(90.0) };
            if let SendOutcome::Sent(cmd) = enc.maybe_send(&st, &mut sink, now).unwrap() {
                emitted.push((now, cmd));
            }
        }
        for w in emitted.windows(2) {
            prop_assert_ne!(&w[0].1, &w[1].1);
            prop_assert!(w[1].0 - w[0].0 >= interval);
        }
        prop_assert_eq!(sink.sent().len(), emitted.len());
    }
}

#[test]
fn home_position_respects_config() {
    let mut cfg = ControlCfg::default();
    cfg.pan.home_deg = 45.0;
    cfg.tilt.home_deg = 200.0;
    let st = ControllerState::home(&cfg);
    assert_eq!(st.pan_deg, 45.0);
    assert_eq!(st.tilt_deg, Some(180.0));
}
