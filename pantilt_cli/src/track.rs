//! Assemble the link, detector and sink for a run and print its summary.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use eyre::WrapErr;
use pantilt_core::error::Result as CoreResult;
use pantilt_core::{RunMode, RunParams, RunSummary};
use pantilt_hardware::{BrightSpotDetector, RecordingSink, SimulatedCamera};

/// Frame pacing of the simulated camera (~30 fps).
const SIM_FRAME_INTERVAL: Duration = Duration::from_millis(33);

#[derive(Debug, Clone, Default)]
pub struct TrackArgs {
    pub sim: bool,
    pub port: Option<String>,
    pub frames: Option<u64>,
    pub cooperative: bool,
}

pub fn run_track(
    cfg: &pantilt_config::Config,
    args: &TrackArgs,
    shutdown: Arc<AtomicBool>,
) -> CoreResult<RunSummary> {
    let mut params: RunParams = cfg.into();
    params.max_frames = args.frames;
    if args.cooperative {
        params.mode = RunMode::Cooperative;
    }
    let detector = BrightSpotDetector::default();

    if args.sim {
        // Nothing to settle on a simulated link.
        params.settle_ms = 0;
        let camera = SimulatedCamera::new(cfg.frame.width, cfg.frame.height)
            .with_interval(SIM_FRAME_INTERVAL);
        return pantilt_core::run(camera, RecordingSink::new(), detector, params, shutdown);
    }

    let port = args.port.as_deref().unwrap_or(&cfg.serial.port);
    run_serial(port, cfg.serial.baud, detector, params, shutdown)
}

#[cfg(feature = "hardware")]
fn run_serial(
    port: &str,
    baud: u32,
    detector: BrightSpotDetector,
    params: RunParams,
    shutdown: Arc<AtomicBool>,
) -> CoreResult<RunSummary> {
    use pantilt_hardware::SerialLink;

    let link = SerialLink::open(port, baud).wrap_err_with(|| format!("open serial port {port}"))?;
    let sink = link
        .try_clone()
        .wrap_err_with(|| format!("clone serial port {port}"))?;
    pantilt_core::run(link, sink, detector, params, shutdown)
}

#[cfg(not(feature = "hardware"))]
fn run_serial(
    port: &str,
    _baud: u32,
    _detector: BrightSpotDetector,
    _params: RunParams,
    _shutdown: Arc<AtomicBool>,
) -> CoreResult<RunSummary> {
    use pantilt_core::error::{Report, TrackerError};

    Err(Report::new(TrackerError::Source(format!(
        "serial support not compiled in (port {port})"
    ))))
    .wrap_err("build with --features hardware or run with --sim")
}

pub fn summary_text(s: &RunSummary) -> String {
    let angles = match s.final_angles.tilt_deg {
        Some(t) => format!("pan={:.1} tilt={t:.1}", s.final_angles.pan_deg),
        None => format!("pan={:.1}", s.final_angles.pan_deg),
    };
    format!(
        "tracked {} frames, sent {} commands, {} write failures, dropped {} frames; {angles}",
        s.frames,
        s.commands_sent,
        s.write_failures,
        s.decoder.dropped()
    )
}

pub fn summary_json(s: &RunSummary) -> String {
    serde_json::json!({
        "frames": s.frames,
        "commands_sent": s.commands_sent,
        "write_failures": s.write_failures,
        "decoder": {
            "frames": s.decoder.frames,
            "overruns": s.decoder.overruns,
            "short_reads": s.decoder.short_reads,
            "timeouts": s.decoder.timeouts,
            "resets": s.decoder.resets,
        },
        "pan_deg": s.final_angles.pan_deg,
        "tilt_deg": s.final_angles.tilt_deg,
    })
    .to_string()
}
