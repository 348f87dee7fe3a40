pub mod driver;
mod emit;

pub use driver::FileReplayDriver;

use crate::core::ReplayMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Destination for replayed sentences.
///
/// Registered once before playback starts; delivery is awaited inline by the
/// replay task, so a listener that blocks stalls playback for the whole
/// session. The driver references the listener, it never owns the consumer.
#[async_trait]
pub trait ReplayListener: Send + Sync {
    async fn notify(&self, msg: ReplayMessage);
}

/// Playback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayOptions {
    /// Speed multiplier dividing recovered time deltas, clamped to 1..=100
    pub speed: i32,
    /// Restart from the first sentence after the last one
    pub loop_playback: bool,
    /// One-shot delay before the first sentence, in milliseconds
    pub initial_delay_ms: u64,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            speed: 1,
            loop_playback: false,
            initial_delay_ms: 0,
        }
    }
}

/// Errors surfaced by [`FileReplayDriver::start_replay`]
#[derive(Debug, Error)]
pub enum StartError {
    #[error("no data loaded or no listener registered")]
    NotReady,

    #[error("failed to launch replay task: {0}")]
    TaskLaunch(String),
}
