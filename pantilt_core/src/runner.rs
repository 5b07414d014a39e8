use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use pantilt_traits::clock::{Clock, MonotonicClock};
use pantilt_traits::{ByteSource, CommandSink, Detector, Frame};

use crate::config::{DecoderCfg, TrackingCfg};
use crate::controller::ControllerState;
use crate::decoder::DecoderStats;
use crate::error::{FrameError, Report, Result as CoreResult, TrackerError};
use crate::handoff::FrameSlot;
use crate::reader::{ExactFrameReader, FrameReader, StreamFrameReader};
use crate::receiver::{DropStreak, FrameReceiver};
use crate::tracking::TrackingLoop;
use crate::util::elapsed_ms;

/// How decoding is scheduled relative to control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Decode, detect, control and send in one loop.
    Cooperative,
    /// Decode on a receiver thread; control runs on the latest frame.
    Threaded,
}

/// Which frame reader drives the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderKind {
    Stream,
    Exact,
}

#[derive(Debug, Clone)]
pub struct RunParams {
    pub decoder: DecoderCfg,
    pub tracking: TrackingCfg,
    pub mode: RunMode,
    pub decoder_kind: DecoderKind,
    /// Wait after opening the link before input is cleared.
    pub settle_ms: u64,
    /// Stop after this many processed frames.
    pub max_frames: Option<u64>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            decoder: DecoderCfg::default(),
            tracking: TrackingCfg::default(),
            mode: RunMode::Threaded,
            decoder_kind: DecoderKind::Stream,
            settle_ms: 2_000,
            max_frames: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub commands_sent: u64,
    pub write_failures: u64,
    pub decoder: DecoderStats,
    pub final_angles: ControllerState,
}

/// Pieces of a run owned by the control side.
struct Control<'a, K, D> {
    tracker: TrackingLoop,
    sink: &'a mut K,
    detector: &'a mut D,
    clock: MonotonicClock,
    max_write_failures: u32,
    consecutive_failures: u32,
    frames: u64,
    commands_sent: u64,
    write_failures: u64,
}

impl<K: CommandSink, D: Detector> Control<'_, K, D> {
    fn on_frame(&mut self, frame: &Frame) -> CoreResult<()> {
        self.frames += 1;
        match self
            .tracker
            .process(frame, self.detector, self.sink, self.clock.now())
        {
            Ok(report) => {
                if report.sent().is_some() {
                    self.commands_sent += 1;
                    self.consecutive_failures = 0;
                }
                Ok(())
            }
            Err(TrackerError::TransportWrite(msg)) => {
                self.write_failures += 1;
                self.consecutive_failures += 1;
                tracing::warn!(
                    error = %msg,
                    consecutive = self.consecutive_failures,
                    "command write failed"
                );
                if self.consecutive_failures >= self.max_write_failures {
                    tracing::error!(
                        failures = self.consecutive_failures,
                        "giving up after repeated write failures"
                    );
                    return Err(Report::new(TrackerError::TransportWrite(msg)));
                }
                Ok(())
            }
            Err(e) => Err(Report::new(e)),
        }
    }

    fn done(&self, shutdown: &AtomicBool, max_frames: Option<u64>) -> bool {
        shutdown.load(Ordering::Relaxed) || max_frames.is_some_and(|max| self.frames >= max)
    }

    fn summary(&self, decoder: DecoderStats) -> RunSummary {
        RunSummary {
            frames: self.frames,
            commands_sent: self.commands_sent,
            write_failures: self.write_failures,
            decoder,
            final_angles: self.tracker.angles(),
        }
    }
}

fn make_reader<S>(source: S, params: &RunParams) -> Box<dyn FrameReader + Send>
where
    S: ByteSource + Send + 'static,
{
    match params.decoder_kind {
        DecoderKind::Stream => Box::new(StreamFrameReader::new(source, params.decoder.clone())),
        DecoderKind::Exact => Box::new(ExactFrameReader::new(source, params.decoder.clone())),
    }
}

/// Sleep for `total`, waking every `slice` to honor `shutdown`.
fn settle<C: Clock>(clock: &C, total: Duration, slice: Duration, shutdown: &AtomicBool) {
    let start = clock.now();
    while !shutdown.load(Ordering::Relaxed) {
        let left = total.saturating_sub(clock.now().saturating_duration_since(start));
        if left.is_zero() {
            break;
        }
        clock.sleep(left.min(slice));
    }
}

/// Track until `shutdown` is set or `max_frames` frames were processed.
///
/// Returns an error only for conditions the caller must act on: repeated
/// command write failures or an invalid tracking configuration. Framing
/// errors are counted and logged, never returned.
pub fn run<S, K, D>(
    source: S,
    mut sink: K,
    mut detector: D,
    params: RunParams,
    shutdown: Arc<AtomicBool>,
) -> CoreResult<RunSummary>
where
    S: ByteSource + Send + 'static,
    K: CommandSink,
    D: Detector,
{
    let tracker = TrackingLoop::try_new(params.tracking.clone())
        .map_err(|e| Report::new(TrackerError::Config(e.to_string())))?;
    let clock = MonotonicClock::new();
    let mut control = Control {
        tracker,
        sink: &mut sink,
        detector: &mut detector,
        clock,
        max_write_failures: params.tracking.command.max_write_failures.max(1),
        consecutive_failures: 0,
        frames: 0,
        commands_sent: 0,
        write_failures: 0,
    };

    let mut reader = make_reader(source, &params);
    settle(
        &clock,
        Duration::from_millis(params.settle_ms),
        params.decoder.poll_timeout(),
        &shutdown,
    );
    if let Err(e) = reader.clear_input() {
        tracing::warn!(error = %e, "failed to clear input after settle");
    }

    tracing::info!(
        mode = ?params.mode,
        decoder = ?params.decoder_kind,
        width = params.decoder.width,
        height = params.decoder.height,
        "tracking start"
    );

    let started = clock.now();
    let summary = match params.mode {
        RunMode::Cooperative => run_cooperative(reader, &mut control, &params, &shutdown)?,
        RunMode::Threaded => run_threaded(reader, &mut control, &params, &shutdown)?,
    };

    tracing::info!(
        frames = summary.frames,
        commands = summary.commands_sent,
        dropped = summary.decoder.dropped(),
        elapsed_ms = elapsed_ms(started, clock.now()),
        "tracking stop"
    );
    Ok(summary)
}

fn run_cooperative<K: CommandSink, D: Detector>(
    mut reader: Box<dyn FrameReader + Send>,
    control: &mut Control<'_, K, D>,
    params: &RunParams,
    shutdown: &Arc<AtomicBool>,
) -> CoreResult<RunSummary> {
    reader.attach_cancel(shutdown.clone());
    let mut streak = DropStreak::default();
    while !control.done(shutdown, params.max_frames) {
        match reader.next_frame() {
            Ok(Some(frame)) => {
                streak.clear();
                control.on_frame(&frame)?;
            }
            Ok(None) => {}
            Err(FrameError::Cancelled) => break,
            Err(err) => streak.note(&err),
        }
    }
    Ok(control.summary(reader.stats()))
}

fn run_threaded<K: CommandSink, D: Detector>(
    reader: Box<dyn FrameReader + Send>,
    control: &mut Control<'_, K, D>,
    params: &RunParams,
    shutdown: &Arc<AtomicBool>,
) -> CoreResult<RunSummary> {
    let slot = Arc::new(FrameSlot::new(params.decoder.width, params.decoder.height));
    let receiver = FrameReceiver::spawn(reader, slot);
    let wait = params.decoder.poll_timeout();
    let mut seen = 0;
    while !control.done(shutdown, params.max_frames) {
        if let Some((seq, frame)) = receiver.wait_frame(seen, wait) {
            seen = seq;
            control.on_frame(&frame)?;
        } else if !receiver.is_running() {
            return Err(Report::new(TrackerError::State(
                "frame receiver thread exited".into(),
            )));
        }
    }
    let stats = receiver.stats();
    drop(receiver);
    Ok(control.summary(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pantilt_traits::clock::test_clock::TestClock;

    #[test]
    fn settle_waits_full_duration() {
        let clock = TestClock::new();
        let start = clock.now();
        let stop = AtomicBool::new(false);
        settle(&clock, Duration::from_millis(250), Duration::from_millis(100), &stop);
        assert_eq!(clock.now() - start, Duration::from_millis(250));
    }

    #[test]
    fn settle_returns_early_on_shutdown() {
        let clock = TestClock::new();
        let start = clock.now();
        let stop = AtomicBool::new(true);
        settle(&clock, Duration::from_secs(5), Duration::from_millis(100), &stop);
        assert_eq!(clock.now(), start);
    }
}
