//! Single-timer dispenser of bounded text increments.
//!
//! Jobs wait in a FIFO queue. Exactly one job is current at a time, and a
//! single timer task releases the next slice of the current job each tick.
//! Callbacks always run with the queue unlocked, so they may freely call
//! back into the scheduler.

use crate::config::{SchedulerConfig, SpeedUpdate};
use crate::error::{TypewriterError, TypewriterResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

/// Receives `(delta, text_so_far, done)` for each released slice.
///
/// Returning `Err` is logged and does not stop delivery.
pub type UpdateFn = Arc<dyn Fn(&str, &str, bool) -> anyhow::Result<()> + Send + Sync>;

/// Identifies one enqueued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    /// Numeric value of the ID.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

struct Job {
    id: JobId,
    text: Arc<str>,
    /// Byte offset of the next undelivered character. `text[..offset]` is
    /// the text delivered so far.
    offset: usize,
    on_update: UpdateFn,
    cancel: Option<CancellationToken>,
}

impl Job {
    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Release up to `chunk_size` characters, returning the byte range.
    fn advance(&mut self, chunk_size: usize) -> (usize, usize) {
        let start = self.offset;
        let end = self.text[start..]
            .char_indices()
            .nth(chunk_size)
            .map_or(self.text.len(), |(i, _)| start + i);
        self.offset = end;
        (start, end)
    }

    fn is_done(&self) -> bool {
        self.offset >= self.text.len()
    }
}

struct Timer {
    generation: u64,
    handle: JoinHandle<()>,
}

struct SchedulerState {
    config: SchedulerConfig,
    queue: VecDeque<Job>,
    current: Option<Job>,
    timer: Option<Timer>,
    /// A tick is running its callback outside the lock.
    delivering: bool,
    generation: u64,
    paused: bool,
    next_job_id: u64,
}

impl SchedulerState {
    fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            queue: VecDeque::new(),
            current: None,
            timer: None,
            delivering: false,
            generation: 0,
            paused: false,
            next_job_id: 0,
        }
    }

    fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
        }
    }

    fn is_pending(&self, id: JobId) -> bool {
        self.current.as_ref().is_some_and(|job| job.id == id)
            || self.queue.iter().any(|job| job.id == id)
    }
}

struct Shared {
    state: Mutex<SchedulerState>,
    runtime: Option<Handle>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.state.get_mut().stop_timer();
    }
}

/// Promote the next job if needed and arm the timer for it.
fn schedule(shared: &Arc<Shared>, state: &mut SchedulerState) {
    if state.paused || state.delivering || state.timer.is_some() {
        return;
    }

    if state.current.is_none() {
        state.current = state.queue.pop_front();
        match &state.current {
            Some(job) => debug!(
                job_id = %job.id,
                chars = job.text.chars().count(),
                "Job started"
            ),
            None => return,
        }
    }

    let Some(runtime) = shared
        .runtime
        .clone()
        .or_else(|| Handle::try_current().ok())
    else {
        error!("No Tokio runtime available, text delivery is stalled");
        return;
    };

    state.generation += 1;
    let generation = state.generation;
    let interval = state.config.interval;
    let weak = Arc::downgrade(shared);

    let handle = runtime.spawn(async move {
        tokio::time::sleep(interval).await;
        if let Some(shared) = weak.upgrade() {
            tick(&shared, generation);
        }
    });
    state.timer = Some(Timer { generation, handle });
}

struct Delivery {
    id: JobId,
    text: Arc<str>,
    start: usize,
    end: usize,
    done: bool,
    on_update: UpdateFn,
}

fn tick(shared: &Arc<Shared>, generation: u64) {
    let delivery = {
        let mut guard = shared.state.lock();
        let state = &mut *guard;

        if state.timer.as_ref().map(|t| t.generation) != Some(generation) {
            return;
        }
        state.timer = None;

        let Some(job) = state.current.as_mut() else {
            schedule(shared, state);
            return;
        };

        if job.is_cancelled() {
            debug!(job_id = %job.id, "Job cancelled by token");
            state.current = None;
            schedule(shared, state);
            return;
        }

        let (start, end) = job.advance(state.config.chunk_size);
        let delivery = Delivery {
            id: job.id,
            text: Arc::clone(&job.text),
            start,
            end,
            done: job.is_done(),
            on_update: Arc::clone(&job.on_update),
        };
        if delivery.done {
            state.current = None;
        }
        state.delivering = true;
        delivery
    };

    trace!(
        job_id = %delivery.id,
        offset = delivery.end,
        done = delivery.done,
        "Releasing slice"
    );

    let delta = &delivery.text[delivery.start..delivery.end];
    let so_far = &delivery.text[..delivery.end];
    match catch_unwind(AssertUnwindSafe(|| {
        (delivery.on_update)(delta, so_far, delivery.done)
    })) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!(job_id = %delivery.id, error = %err, "Update callback failed"),
        Err(_) => error!(job_id = %delivery.id, "Update callback panicked"),
    }

    if delivery.done {
        debug!(job_id = %delivery.id, "Job finished");
    }

    let mut state = shared.state.lock();
    state.delivering = false;
    schedule(shared, &mut state);
}

/// Releases queued text in bounded slices on a fixed cadence.
///
/// Cloning yields another handle to the same scheduler. The timer stops
/// when the last handle is dropped.
#[derive(Clone)]
pub struct ChunkScheduler {
    shared: Arc<Shared>,
}

impl ChunkScheduler {
    /// Create a scheduler on the current Tokio runtime, if there is one.
    ///
    /// Outside a runtime the timer is spawned on whatever runtime is
    /// current when work is enqueued.
    pub fn new(config: SchedulerConfig) -> Self {
        Self::build(config, Handle::try_current().ok())
    }

    /// Create a scheduler, failing if no Tokio runtime is current.
    pub fn try_new(config: SchedulerConfig) -> TypewriterResult<Self> {
        let runtime =
            Handle::try_current().map_err(|e| TypewriterError::NoRuntime(e.to_string()))?;
        Ok(Self::build(config, Some(runtime)))
    }

    /// Create a scheduler whose timer runs on `runtime`.
    pub fn with_runtime(config: SchedulerConfig, runtime: Handle) -> Self {
        Self::build(config, Some(runtime))
    }

    fn build(config: SchedulerConfig, runtime: Option<Handle>) -> Self {
        let config = config.chunk_size(config.chunk_size);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SchedulerState::new(config)),
                runtime,
            }),
        }
    }

    /// Queue `text` for delivery to `on_update`.
    ///
    /// Starts the job at once if nothing else is current; the first slice
    /// is released one interval later. A signaled `cancel` token abandons
    /// the job at its next tick.
    pub fn enqueue<F>(
        &self,
        text: impl Into<String>,
        on_update: F,
        cancel: Option<CancellationToken>,
    ) -> JobHandle
    where
        F: Fn(&str, &str, bool) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut state = self.shared.state.lock();
        state.next_job_id += 1;
        let id = JobId(state.next_job_id);

        state.queue.push_back(Job {
            id,
            text: Arc::from(text.into()),
            offset: 0,
            on_update: Arc::new(on_update),
            cancel,
        });
        debug!(job_id = %id, queued = state.queue.len(), "Job enqueued");

        schedule(&self.shared, &mut state);

        JobHandle {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Change the pacing. Applies from the next tick on; an armed timer
    /// keeps its original delay.
    pub fn set_speed(&self, update: SpeedUpdate) {
        let mut state = self.shared.state.lock();
        state.config.apply(update);
        debug!(
            chunk_size = state.config.chunk_size,
            interval_ms = state.config.interval.as_millis() as u64,
            "Speed changed"
        );
    }

    /// Stop the timer, keeping the current job and the queue.
    pub fn pause(&self) {
        let mut state = self.shared.state.lock();
        if !state.paused {
            state.paused = true;
            state.stop_timer();
            debug!("Scheduler paused");
        }
    }

    /// Resume after [`pause`](Self::pause). No-op when not paused.
    pub fn resume(&self) {
        let mut state = self.shared.state.lock();
        if state.paused {
            state.paused = false;
            debug!("Scheduler resumed");
            schedule(&self.shared, &mut state);
        }
    }

    /// Drop every job, current and queued, without final callbacks.
    pub fn cancel(&self) {
        let mut state = self.shared.state.lock();
        let dropped = state.queue.len() + usize::from(state.current.is_some());
        state.queue.clear();
        state.current = None;
        state.stop_timer();
        debug!(dropped, "All jobs cancelled");
    }

    /// Whether the scheduler is paused.
    pub fn is_paused(&self) -> bool {
        self.shared.state.lock().paused
    }

    /// Whether a tick is armed or in progress.
    pub fn is_running(&self) -> bool {
        let state = self.shared.state.lock();
        state.timer.is_some() || state.delivering
    }

    /// Number of jobs waiting behind the current one.
    pub fn pending_jobs(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// ID of the job being delivered, if any.
    pub fn current_job(&self) -> Option<JobId> {
        self.shared.state.lock().current.as_ref().map(|job| job.id)
    }

    /// Current pacing.
    pub fn config(&self) -> SchedulerConfig {
        self.shared.state.lock().config
    }
}

impl Default for ChunkScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl fmt::Debug for ChunkScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("ChunkScheduler")
            .field("config", &state.config)
            .field("current", &state.current.as_ref().map(|job| job.id))
            .field("queued", &state.queue.len())
            .field("paused", &state.paused)
            .finish()
    }
}

/// Cancels one enqueued job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: JobId,
    shared: Weak<Shared>,
}

impl JobHandle {
    /// The job's ID.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Cancel the job without a final callback.
    ///
    /// Returns `false` if the job had already finished or been cancelled.
    pub fn cancel(&self) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        let mut state = shared.state.lock();

        if state.current.as_ref().is_some_and(|job| job.id == self.id) {
            state.current = None;
            state.stop_timer();
            debug!(job_id = %self.id, "Current job cancelled");
            schedule(&shared, &mut state);
            return true;
        }

        let before = state.queue.len();
        state.queue.retain(|job| job.id != self.id);
        let removed = state.queue.len() != before;
        if removed {
            debug!(job_id = %self.id, "Queued job cancelled");
        }
        removed
    }

    /// Whether the job is neither current nor queued.
    pub fn is_finished(&self) -> bool {
        self.shared
            .upgrade()
            .map_or(true, |shared| !shared.state.lock().is_pending(self.id))
    }
}
