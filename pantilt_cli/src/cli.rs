//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "pantilt", version, about = "Camera-driven pan/tilt tracker")]
pub struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE", default_value = "etc/pantilt.toml")]
    pub config: PathBuf,

    /// Log and report as JSON lines instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG wins if set
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Track the brightest object and drive the servos
    Track {
        /// Use the simulated camera and servo sink instead of a serial port
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
        /// Serial port to open (overrides serial.port)
        #[arg(long, value_name = "PORT")]
        port: Option<String>,
        /// Stop after processing this many frames
        #[arg(long, value_name = "N")]
        frames: Option<u64>,
        /// Decode and control in a single thread (overrides runner.mode)
        #[arg(long, action = ArgAction::SetTrue)]
        cooperative: bool,
    },
    /// Load and validate the config, then print the effective settings
    SelfCheck,
}
