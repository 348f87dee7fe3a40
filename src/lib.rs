//! Replay recorded NMEA0183 logs with their original inter-message timing.
//!
//! [`input::load_log`] recovers a relative time axis from heterogeneous log
//! timestamp encodings; [`replay::FileReplayDriver`] walks the loaded
//! sentences in a background task and delivers each one to a registered
//! [`replay::ReplayListener`], scaled by a speed multiplier and controllable
//! via pause/resume, loop, and a join-on-stop stop.

pub mod core;
pub mod input;
pub mod replay;

pub use crate::core::{DataLine, ReplayMessage, SOURCE_ID};
pub use crate::input::{load_log, LoadError};
pub use crate::replay::{FileReplayDriver, ReplayListener, ReplayOptions, StartError};
