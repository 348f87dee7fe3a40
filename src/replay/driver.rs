use crate::core::{DataLine, ReplayMessage};
use crate::input::{self, LoadError};
use crate::replay::{emit, ReplayListener, ReplayOptions, StartError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Re-check interval while paused; pause/resume latency is bounded by this
const PAUSE_POLL_MS: u64 = 100;

/// Inter-message delay when no usable time delta exists
const DEFAULT_DELAY_MS: f64 = 100.0;

/// Clamp range for computed delays, guarding against pathological timestamps
const MIN_DELAY_MS: f64 = 10.0;
const MAX_DELAY_MS: f64 = 5000.0;

const MIN_SPEED: i32 = 1;
const MAX_SPEED: i32 = 100;

/// Fields shared across the control/task boundary, always accessed under the
/// mutex and never held across a sleep
struct ControlState {
    paused: bool,
    speed: i32,
}

struct SharedState {
    /// True from a successful start until natural end or stop; both writers
    /// are idempotent toward false
    playing: AtomicBool,
    looping: AtomicBool,
    initial_delay_ms: AtomicU64,
    control: Mutex<ControlState>,
}

impl SharedState {
    fn control(&self) -> MutexGuard<'_, ControlState> {
        self.control.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Replays a recorded NMEA0183 log to a registered listener, reproducing the
/// original inter-message timing.
///
/// The sentence sequence is loaded once at construction and is immutable for
/// the life of a session. One background task per session walks the sequence;
/// the control surface (`start_replay`, `stop_replay`, `set_paused`,
/// `set_replay_speed`, `set_loop`, `set_initial_delay`) is callable from any
/// thread. `stop_replay` joins the task, so once it returns no further
/// notification is ever delivered for that session.
pub struct FileReplayDriver {
    file_path: Option<PathBuf>,
    data_lines: Arc<Vec<DataLine>>,
    shared: Arc<SharedState>,
    listener: Option<Arc<dyn ReplayListener>>,
    task: Option<JoinHandle<()>>,
}

impl FileReplayDriver {
    /// Load `path` and build a driver around its sentences
    pub fn new(path: &Path, options: ReplayOptions) -> Result<Self, LoadError> {
        let data_lines = input::load_log(path)?;
        let mut driver = Self::from_data_lines(data_lines, options);
        driver.file_path = Some(path.to_path_buf());
        Ok(driver)
    }

    /// Build a driver around pre-parsed records (no backing file)
    pub fn from_data_lines(data_lines: Vec<DataLine>, options: ReplayOptions) -> Self {
        Self {
            file_path: None,
            data_lines: Arc::new(data_lines),
            shared: Arc::new(SharedState {
                playing: AtomicBool::new(false),
                looping: AtomicBool::new(options.loop_playback),
                initial_delay_ms: AtomicU64::new(options.initial_delay_ms),
                control: Mutex::new(ControlState {
                    paused: false,
                    speed: options.speed.clamp(MIN_SPEED, MAX_SPEED),
                }),
            }),
            listener: None,
            task: None,
        }
    }

    /// Register the consumer; must precede a successful [`start_replay`].
    /// Does not itself start playback.
    ///
    /// [`start_replay`]: Self::start_replay
    pub fn set_listener(&mut self, listener: Arc<dyn ReplayListener>) {
        debug!("listener registered");
        self.listener = Some(listener);
    }

    /// Start the replay session.
    ///
    /// A no-op returning `Ok` when already running. Fails with
    /// [`StartError::NotReady`] when no data is loaded or no listener is
    /// registered, and with [`StartError::TaskLaunch`] when no async runtime
    /// is available to schedule the task on, in which case state is left as
    /// if this was never called.
    pub fn start_replay(&mut self) -> Result<(), StartError> {
        if self.is_replaying() {
            debug!("start_replay: already replaying");
            return Ok(());
        }

        if self.data_lines.is_empty() {
            warn!("start_replay: no data to replay");
            return Err(StartError::NotReady);
        }
        let Some(listener) = self.listener.clone() else {
            warn!("start_replay: no listener registered");
            return Err(StartError::NotReady);
        };

        // Drop the finished handle of a naturally ended session, if any.
        self.task = None;

        self.shared.control().paused = false;
        self.shared.playing.store(true, Ordering::SeqCst);

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                self.shared.playing.store(false, Ordering::SeqCst);
                return Err(StartError::TaskLaunch(e.to_string()));
            }
        };
        self.task = Some(handle.spawn(replay_task(
            self.data_lines.clone(),
            self.shared.clone(),
            listener,
        )));

        info!("started replay of {} sentences", self.data_lines.len());
        Ok(())
    }

    /// Stop the session and join the replay task.
    ///
    /// After this returns, no further notification will be delivered. No-op
    /// when nothing is running.
    pub async fn stop_replay(&mut self) {
        self.shared.playing.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            let _ = task.await;
            info!("replay stopped");
        }
    }

    /// Suspend or resume emission without stopping the task
    pub fn set_paused(&self, paused: bool) {
        self.shared.control().paused = paused;
        info!("replay {}", if paused { "paused" } else { "resumed" });
    }

    /// Set the speed multiplier, clamped to `1..=100`
    pub fn set_replay_speed(&self, speed: i32) {
        let clamped = speed.clamp(MIN_SPEED, MAX_SPEED);
        self.shared.control().speed = clamped;
        info!("replay speed set to {}x", clamped);
    }

    /// Restart from the first sentence after the last one
    pub fn set_loop(&self, enabled: bool) {
        self.shared.looping.store(enabled, Ordering::SeqCst);
    }

    /// One-shot delay before the first sentence of the next session
    pub fn set_initial_delay(&self, delay_ms: u64) {
        self.shared.initial_delay_ms.store(delay_ms, Ordering::SeqCst);
    }

    pub fn is_replaying(&self) -> bool {
        self.shared.playing.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.shared.control().paused
    }

    pub fn replay_speed(&self) -> i32 {
        self.shared.control().speed
    }

    pub fn sentence_count(&self) -> usize {
        self.data_lines.len()
    }

    /// Loaded records, in file order
    pub fn data_lines(&self) -> &[DataLine] {
        &self.data_lines
    }

    /// Re-read the backing file, stopping any running session first
    pub async fn reload(&mut self) -> Result<(), LoadError> {
        self.stop_replay().await;
        let path = match &self.file_path {
            Some(path) => path.clone(),
            // In-memory drivers have no backing file to reload.
            None => return Err(LoadError::NotFound(PathBuf::new())),
        };
        self.data_lines = Arc::new(input::load_log(&path)?);
        Ok(())
    }

    /// The replay source is read-only; sending always fails
    pub fn send_message(&self, _msg: &ReplayMessage) -> bool {
        false
    }
}

impl Drop for FileReplayDriver {
    fn drop(&mut self) {
        // Drop cannot await the join, so signal and abort the task instead.
        self.shared.playing.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Delay before the next record, in milliseconds.
///
/// Scaled from the recorded delta when one exists and is positive, clamped to
/// `10..=5000`; otherwise the 100ms default (also used after the last
/// record). Non-monotonic timestamps therefore yield the default rather than
/// a rewind.
fn compute_delay_ms(current: &DataLine, next: Option<&DataLine>, speed: i32) -> f64 {
    if let Some(next) = next {
        let delta = next.timestamp_offset - current.timestamp_offset;
        if speed > 0 && delta > 0.0 {
            return (delta * 1000.0 / speed as f64).clamp(MIN_DELAY_MS, MAX_DELAY_MS);
        }
    }
    DEFAULT_DELAY_MS
}

/// Replay task body: one per session, exits when `playing` clears.
async fn replay_task(
    lines: Arc<Vec<DataLine>>,
    shared: Arc<SharedState>,
    listener: Arc<dyn ReplayListener>,
) {
    debug!("replay task started");

    let initial_delay = shared.initial_delay_ms.load(Ordering::SeqCst);
    if initial_delay > 0 {
        info!("waiting {} ms before first sentence", initial_delay);
        tokio::time::sleep(Duration::from_millis(initial_delay)).await;
    }

    let mut index = 0usize;
    while shared.playing.load(Ordering::SeqCst) {
        let paused = shared.control().paused;
        if paused {
            tokio::time::sleep(Duration::from_millis(PAUSE_POLL_MS)).await;
            continue;
        }

        if index >= lines.len() {
            if shared.looping.load(Ordering::SeqCst) {
                debug!("looping back to start");
                index = 0;
                continue;
            }
            info!("reached end of replay data");
            shared.playing.store(false, Ordering::SeqCst);
            break;
        }

        // Soft-fail delivery: a malformed record is logged and skipped, and
        // the iteration still advances and sleeps like any other.
        let current = &lines[index];
        emit::deliver(&current.sentence, listener.as_ref()).await;

        // Sample speed here, not at the top of the iteration, so a change
        // made during delivery already applies to the following gap.
        let speed = shared.control().speed;
        let delay_ms = compute_delay_ms(current, lines.get(index + 1), speed);
        index += 1;
        tokio::time::sleep(Duration::from_millis(delay_ms as u64)).await;
    }

    debug!("replay task exiting");
}
