#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Camera-to-servo tracking core (hardware-agnostic).
//!
//! Raw bytes from the camera link come in through `pantilt_traits::ByteSource`,
//! servo commands go out through `pantilt_traits::CommandSink`, and object
//! detection is delegated to a host `pantilt_traits::Detector`.
//!
//! ## Pipeline
//!
//! - **Decoding**: marker-framed `W×H` grayscale frames (`decoder`, `reader`)
//! - **Handoff**: latest-frame slot shared with a background receiver
//!   (`handoff`, `receiver`)
//! - **Smoothing**: bbox clamp, integer center, EMA with reset on loss
//!   (`smoothing`)
//! - **Control**: deadbanded proportional step per axis (`controller`)
//! - **Commands**: `PT:`/`ANG:` text, sent only when changed and no faster
//!   than the configured interval (`command`)
//!
//! `tracking::TrackingLoop` ties one cycle together; `runner::run` drives it
//! either in a single thread or with a receiver thread.

pub mod command;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod decoder;
pub mod error;
pub mod handoff;
pub mod hw_error;
pub mod mocks;
pub mod reader;
pub mod receiver;
pub mod runner;
pub mod smoothing;
pub mod tracking;
pub mod util;

pub use command::{CommandEncoder, SendOutcome, SendThrottle, format_command};
pub use config::{AxisCfg, AxisMode, CommandCfg, ControlCfg, DecoderCfg, TrackingCfg};
pub use controller::{ControllerState, step_from_err};
pub use decoder::{DecoderState, DecoderStats, FrameDecoder};
pub use error::{BuildError, FrameError, Result, TrackerError};
pub use handoff::FrameSlot;
pub use reader::{ExactFrameReader, FrameReader, StreamFrameReader};
pub use receiver::FrameReceiver;
pub use runner::{DecoderKind, RunMode, RunParams, RunSummary, run};
pub use smoothing::{Point, SmoothingState, TrackResult, smooth};
pub use tracking::{CycleReport, TrackingLoop};
