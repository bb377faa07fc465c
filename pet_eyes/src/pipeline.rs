// THEORY:
// The `pipeline` module is the top-level API of the engine: a `FilterSession`
// drives repeated capture → transform → render cycles for one viewer. It owns
// the session state (is filtering on, which profile is selected, what tick is
// pending) and is the only thing allowed to change it.
//
// Key architectural principles:
// 1.  **Explicit State Machine**: The loop is `Idle → Scheduled → Running →
//     Scheduled | Idle`. Every scheduled tick carries a ticket number and only
//     the tick whose ticket matches the pending one may run. A tick that was
//     cancelled too late, superseded by a re-enable, or fired after teardown
//     finds a mismatched ticket and does nothing.
// 2.  **One Frame In Flight**: A cycle pulls exactly one frame, filters it
//     synchronously and presents it before asking for the next tick. The frame
//     I/O lock is held for the whole cycle, so two cycles of one session can
//     never overlap and memory stays bounded by a single frame.
// 3.  **Atomic Session Updates**: The lifecycle entry points (`set_active_profile`,
//     `set_filtering`, `end`) mutate state under one mutex. A cycle snapshots the
//     selected profile at its start, so a profile switch applies from the next
//     cycle and never to pixels already rendered.
// 4.  **Transient Gaps Are Not Errors**: A source with no frame ready makes the
//     cycle skip its transform and present steps; the loop still reschedules.
// 5.  **Weak Ticks**: Ticks hold a `Weak` reference to the session, so dropping
//     the session tears the loop down even if a scheduler still holds a tick.

use crate::core_modules::frame::filter_frame;
use crate::error::{Result, VisionError};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, trace};

// Re-export key data structures for the public API.
pub use crate::core_modules::frame::{FilterStrategy, FrameBuffer};
pub use crate::core_modules::pixel::pixel::ColorSample;
pub use crate::core_modules::registry::Registry;
pub use crate::core_modules::vision_model::{Reprojection, Species, VisionModel, VisionProfile};
pub use crate::scheduler::{
    DEFAULT_REFRESH_RATE_HZ, FrameTicker, ManualHandle, ManualTicker, Scheduler, Tick, TickHandle,
};

/// Pull side of the camera: the latest captured image, if one is ready.
pub trait FrameSource: Send + 'static {
    fn current_frame(&mut self) -> Option<FrameBuffer>;
}

/// Push side of the display: shows or stores a filtered frame.
///
/// `present_frame` runs while the session's frame I/O lock is held but not its
/// state lock: the sink may query or switch the session (`is_filtering`,
/// `set_filtering`, `set_active_profile`) from inside the call. A disable that
/// races with a present already under way may return before that present
/// finishes; no present starts after it returns.
pub trait FrameSink: Send + 'static {
    fn present_frame(&mut self, frame: FrameBuffer);
}

impl<F> FrameSource for F
where
    F: FnMut() -> Option<FrameBuffer> + Send + 'static,
{
    fn current_frame(&mut self) -> Option<FrameBuffer> {
        self()
    }
}

impl<F> FrameSink for F
where
    F: FnMut(FrameBuffer) + Send + 'static,
{
    fn present_frame(&mut self, frame: FrameBuffer) {
        self(frame)
    }
}

/// Configuration for a filtering session, allowing for tunable behavior.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Rate of the refresh signal when the loop is driven by a `FrameTicker`.
    pub refresh_rate_hz: f64,
    /// How each frame's pixels are walked.
    pub strategy: FilterStrategy,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            refresh_rate_hz: DEFAULT_REFRESH_RATE_HZ,
            strategy: FilterStrategy::default(),
        }
    }
}

/// Counters describing what the loop has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Cycles that filtered a frame and handed it to the sink.
    pub frames_presented: u64,
    /// Cycles that found no frame ready at the source.
    pub frames_skipped: u64,
    /// Cycles whose output was dropped because filtering stopped mid-cycle.
    pub cycles_discarded: u64,
}

enum LoopPhase<H> {
    Idle,
    Scheduled { ticket: u64, handle: H },
    Running { ticket: u64 },
}

struct SessionState<H> {
    active: bool,
    selected: Option<VisionProfile>,
    phase: LoopPhase<H>,
    next_ticket: u64,
    stats: LoopStats,
}

impl<H> SessionState<H> {
    fn is_pending(&self, ticket: u64) -> bool {
        matches!(self.phase, LoopPhase::Scheduled { ticket: t, .. } if t == ticket)
    }

    fn is_running(&self, ticket: u64) -> bool {
        matches!(self.phase, LoopPhase::Running { ticket: t } if t == ticket)
    }
}

struct FrameIo<Src, Snk> {
    source: Src,
    sink: Snk,
}

struct SessionInner<Src, Snk, Sch: Scheduler> {
    registry: Arc<Registry>,
    scheduler: Sch,
    strategy: FilterStrategy,
    state: Mutex<SessionState<Sch::Handle>>,
    io: Mutex<FrameIo<Src, Snk>>,
}

/// One viewer's filtering session.
pub struct FilterSession<Src, Snk, Sch>
where
    Src: FrameSource,
    Snk: FrameSink,
    Sch: Scheduler,
{
    inner: Arc<SessionInner<Src, Snk, Sch>>,
}

impl<Src, Snk, Sch> FilterSession<Src, Snk, Sch>
where
    Src: FrameSource,
    Snk: FrameSink,
    Sch: Scheduler,
{
    /// Starts an idle session with nothing selected.
    pub fn new(registry: Arc<Registry>, source: Src, sink: Snk, scheduler: Sch, config: FilterConfig) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                registry,
                scheduler,
                strategy: config.strategy,
                state: Mutex::new(SessionState {
                    active: false,
                    selected: None,
                    phase: LoopPhase::Idle,
                    next_ticket: 0,
                    stats: LoopStats::default(),
                }),
                io: Mutex::new(FrameIo { source, sink }),
            }),
        }
    }

    /// Selects the profile used from the next cycle on. Does not start or stop filtering.
    pub fn set_active_profile(&self, id: &str) -> Result<VisionProfile> {
        let profile = self.inner.registry.lookup(id)?;
        self.inner.state.lock().selected = Some(profile);
        info!(profile = profile.id, "vision profile selected");
        Ok(profile)
    }

    /// Turns the loop on or off. Requesting the current state is a no-op.
    pub fn set_filtering(&self, enabled: bool) -> Result<()> {
        let mut state = self.inner.state.lock();
        SessionInner::set_filtering_locked(&self.inner, &mut state, enabled)
    }

    /// Flips filtering and returns the new state.
    pub fn toggle_filtering(&self) -> Result<bool> {
        let mut state = self.inner.state.lock();
        let enabled = !state.active;
        SessionInner::set_filtering_locked(&self.inner, &mut state, enabled)?;
        Ok(enabled)
    }

    /// Ends the viewing session: stops filtering and clears the selection.
    pub fn end(&self) {
        let mut state = self.inner.state.lock();
        state.active = false;
        self.inner.stop_locked(&mut state);
        if let Some(profile) = state.selected.take() {
            info!(profile = profile.id, "filter session ended");
        }
    }

    pub fn is_filtering(&self) -> bool {
        self.inner.state.lock().active
    }

    pub fn active_profile(&self) -> Option<VisionProfile> {
        self.inner.state.lock().selected
    }

    pub fn stats(&self) -> LoopStats {
        self.inner.state.lock().stats
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }
}

impl<Src, Snk, Sch> Drop for FilterSession<Src, Snk, Sch>
where
    Src: FrameSource,
    Snk: FrameSink,
    Sch: Scheduler,
{
    fn drop(&mut self) {
        self.end();
    }
}

impl<Src, Snk, Sch> SessionInner<Src, Snk, Sch>
where
    Src: FrameSource,
    Snk: FrameSink,
    Sch: Scheduler,
{
    fn set_filtering_locked(this: &Arc<Self>, state: &mut SessionState<Sch::Handle>, enabled: bool) -> Result<()> {
        if state.active == enabled {
            return Ok(());
        }
        if enabled {
            let Some(profile) = state.selected else {
                return Err(VisionError::NoProfileSelected);
            };
            state.active = true;
            Self::schedule_locked(this, state);
            info!(profile = profile.id, "filtering enabled");
        } else {
            state.active = false;
            this.stop_locked(state);
            info!(stats = ?state.stats, "filtering disabled");
        }
        Ok(())
    }

    /// Requests exactly one future cycle and records it as the pending one.
    fn schedule_locked(this: &Arc<Self>, state: &mut SessionState<Sch::Handle>) {
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        let session = Arc::downgrade(this);
        let handle = this.scheduler.schedule_next_cycle(Box::new(move || {
            if let Some(inner) = session.upgrade() {
                Self::run_one_cycle(&inner, ticket);
            }
        }));
        state.phase = LoopPhase::Scheduled { ticket, handle };
    }

    /// Cancels the pending tick, if any. A running cycle notices on its own.
    fn stop_locked(&self, state: &mut SessionState<Sch::Handle>) {
        if let LoopPhase::Scheduled { ticket, handle } = std::mem::replace(&mut state.phase, LoopPhase::Idle) {
            trace!(ticket, "pending tick cancelled");
            self.scheduler.cancel(handle);
        }
    }

    fn run_one_cycle(this: &Arc<Self>, ticket: u64) {
        let profile = {
            let mut state = this.state.lock();
            if !state.active || !state.is_pending(ticket) {
                trace!(ticket, "stale tick ignored");
                return;
            }
            let Some(profile) = state.selected else {
                state.phase = LoopPhase::Idle;
                return;
            };
            state.phase = LoopPhase::Running { ticket };
            profile
        };

        let mut io = this.io.lock();
        let filtered = io.source.current_frame().map(|mut frame| {
            filter_frame(&profile, &mut frame, this.strategy);
            frame
        });

        {
            let mut state = this.state.lock();
            if !state.is_running(ticket) {
                state.stats.cycles_discarded += 1;
                debug!(ticket, "filtering stopped mid-cycle, output discarded");
                return;
            }
            match &filtered {
                Some(_) => state.stats.frames_presented += 1,
                None => {
                    state.stats.frames_skipped += 1;
                    trace!(ticket, "no frame ready, cycle skipped");
                }
            }
        }

        // Presented without the state lock so the sink may call back into the session.
        if let Some(frame) = filtered {
            io.sink.present_frame(frame);
        }
        drop(io);

        let mut state = this.state.lock();
        if !state.is_running(ticket) {
            debug!(ticket, "filtering stopped while presenting");
            return;
        }
        Self::schedule_locked(this, &mut state);
        debug!(
            ticket,
            profile = profile.id,
            presented = state.stats.frames_presented,
            skipped = state.stats.frames_skipped,
            "cycle complete"
        );
    }
}
