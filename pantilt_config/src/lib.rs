#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the pan/tilt tracker.
//!
//! `Config` and its sections are deserialized from TOML and validated with
//! `Config::validate`. Every section except `[serial]` may be omitted; the
//! defaults match a 160x120 grayscale camera streaming at 1.5 Mbaud into a
//! two-servo rig.
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SerialCfg {
    /// Serial endpoint identifier, e.g. "/dev/ttyUSB0" or "COM5".
    pub port: String,
    #[serde(default = "default_baud")]
    pub baud: u32,
    /// Wait after opening the port (the camera board resets on connect).
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

fn default_baud() -> u32 {
    1_500_000
}

fn default_settle_ms() -> u64 {
    2_000
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FrameCfg {
    pub width: usize,
    pub height: usize,
    /// Max wait for a START_IMAGE/END_IMAGE marker, and the bound on a
    /// capture that has started but not finished.
    pub marker_timeout_ms: u64,
    /// Max wait for the raw payload in exact-read mode.
    pub payload_timeout_ms: u64,
    /// Per-read timeout of the background receiver; bounds shutdown latency.
    pub poll_timeout_ms: u64,
}

impl Default for FrameCfg {
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SmoothingCfg {
    /// EMA weight of the newest center. Range: (0.0, 1.0]; smaller = smoother.
    pub alpha: f32,
}

impl Default for SmoothingCfg {
    fn default() -> Self {
        Self { alpha: 0.12 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Axes {
    /// Pan only; commands are `ANG:<deg>`.
    Single,
    /// Pan and tilt; commands are `PT:<pan>,<tilt>`.
    #[default]
    Dual,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlCfg {
    pub axes: Axes,
    pub gain_pan: f32,
    pub gain_tilt: f32,
    /// Largest angular change per cycle, in degrees.
    pub max_step_deg: f32,
    /// Pixel error at or below which no motion is issued.
    pub deadband_px: f32,
    pub home_pan_deg: f32,
    pub home_tilt_deg: f32,
    /// Flip the correction sign for a mount wired in reverse.
    pub invert_pan: bool,
    pub invert_tilt: bool,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            axes: Axes::Dual,
            gain_pan: 18.0,
            gain_tilt: 18.0,
            max_step_deg: 3.0,
            deadband_px: 8.0,
            home_pan_deg: 90.0,
            home_tilt_deg: 90.0,
            invert_pan: false,
            invert_tilt: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CommandCfg {
    /// Minimum spacing between two emitted commands.
    pub send_interval_ms: u64,
    /// Consecutive write failures tolerated before the run gives up.
    pub max_write_failures: u32,
}

impl Default for CommandCfg {
    fn default() -> Self {
        Self {
            send_interval_ms: 60,
            max_write_failures: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Background receiver thread feeding the control loop.
    #[default]
    Threaded,
    /// Decode, detect and command in one loop.
    Cooperative,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DecoderMode {
    /// Byte-oriented state machine fed with whatever the link returns.
    #[default]
    Stream,
    /// Marker sync, then one bounded read of exactly W*H bytes.
    Exact,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RunnerCfg {
    pub mode: RunMode,
    pub decoder: DecoderMode,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub serial: SerialCfg,
    #[serde(default)]
    pub frame: FrameCfg,
    #[serde(default)]
    pub smoothing: SmoothingCfg,
    #[serde(default)]
    pub control: ControlCfg,
    #[serde(default)]
    pub command: CommandCfg,
    #[serde(default)]
    pub runner: RunnerCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

fn angle_in_range(deg: f32) -> bool {
    (0.0..=180.0).contains(&deg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Serial
        if self.serial.port.trim().is_empty() {
            eyre::bail!("serial.port must not be empty");
        }
        if self.serial.baud == 0 {
            eyre::bail!("serial.baud must be > 0");
        }
        if self.serial.settle_ms > 60 * 1000 {
            eyre::bail!("serial.settle_ms is unreasonably large (>60s)");
        }

        // Frame
        if self.frame.width == 0 || self.frame.height == 0 {
            eyre::bail!("frame.width and frame.height must be >= 1");
        }
        if self.frame.width.checked_mul(self.frame.height).is_none() {
            eyre::bail!("frame.width * frame.height overflows");
        }
        if self.frame.marker_timeout_ms == 0 {
            eyre::bail!("frame.marker_timeout_ms must be >= 1");
        }
        if self.frame.payload_timeout_ms == 0 {
            eyre::bail!("frame.payload_timeout_ms must be >= 1");
        }
        if self.frame.poll_timeout_ms == 0 {
            eyre::bail!("frame.poll_timeout_ms must be >= 1");
        }

        // Smoothing
        let alpha = self.smoothing.alpha;
        if !(alpha > 0.0 && alpha <= 1.0) {
            eyre::bail!("smoothing.alpha must be in (0.0, 1.0]");
        }

        // Control
        if !(self.control.gain_pan.is_finite() && self.control.gain_pan > 0.0) {
            eyre::bail!("control.gain_pan must be > 0");
        }
        if !(self.control.gain_tilt.is_finite() && self.control.gain_tilt > 0.0) {
            eyre::bail!("control.gain_tilt must be > 0");
        }
        if !(self.control.max_step_deg.is_finite() && self.control.max_step_deg >= 0.0) {
            eyre::bail!("control.max_step_deg must be >= 0");
        }
        if self.control.max_step_deg > 180.0 {
            eyre::bail!("control.max_step_deg must be <= 180");
        }
        if !(self.control.deadband_px.is_finite() && self.control.deadband_px >= 0.0) {
            eyre::bail!("control.deadband_px must be >= 0");
        }
        if !angle_in_range(self.control.home_pan_deg) {
            eyre::bail!("control.home_pan_deg must be in [0, 180]");
        }
        if !angle_in_range(self.control.home_tilt_deg) {
            eyre::bail!("control.home_tilt_deg must be in [0, 180]");
        }

        // Command
        if self.command.max_write_failures == 0 {
            eyre::bail!("command.max_write_failures must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
