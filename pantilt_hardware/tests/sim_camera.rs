use std::time::{Duration, Instant};

use pantilt_hardware::sim::TARGET_SIZE;
use pantilt_hardware::{BrightSpotDetector, SimulatedCamera};
use pantilt_traits::{BBox, ByteSource, Detector, Frame};

#[test]
fn paced_camera_times_out_between_frames() {
    let mut cam = SimulatedCamera::new(8, 4).with_interval(Duration::from_millis(200));
    let mut buf = [0u8; 4096];
    // First frame is due immediately.
    assert!(cam.read(&mut buf, Duration::from_millis(5)).unwrap() > 0);
    let t0 = Instant::now();
    assert_eq!(cam.read(&mut buf, Duration::from_millis(20)).unwrap(), 0);
    assert!(t0.elapsed() >= Duration::from_millis(20));
    assert_eq!(cam.frames_sent(), 1);
}

#[test]
fn clear_input_drops_partial_frame() {
    let mut cam = SimulatedCamera::new(160, 120);
    let mut buf = [0u8; 64];
    cam.read(&mut buf, Duration::from_millis(5)).unwrap();
    cam.clear_input().unwrap();
    // Next read starts a fresh frame.
    let n = cam.read(&mut buf, Duration::from_millis(5)).unwrap();
    assert!(buf[..n].starts_with(b"START_IMAGE\r\n"));
}

#[test]
fn detector_finds_simulated_target() {
    let cam = SimulatedCamera::new(160, 120);
    let mut det = BrightSpotDetector::default();
    for n in [0, 5, 40, 77] {
        let frame = Frame::new(160, 120, cam.render(n)).unwrap();
        let (x, y) = cam.target_at(n);
        let size = TARGET_SIZE as i32;
        let d = det.detect(&frame).expect("target visible");
        assert_eq!(d.bbox, BBox::new(x as i32, y as i32, size, size));
    }
}
