// THEORY:
// The `scheduler` module abstracts the "ready for next frame" signal. The filter
// loop never sleeps or spins on its own; it asks a `Scheduler` for exactly one
// future invocation, gets back an owned handle, and either lets the tick fire or
// hands the handle back to `cancel`.
//
// Two implementations ship with the crate:
// 1.  **FrameTicker**: a tokio-driven ticker aligned to a fixed refresh period,
//     the stand-in for a display's vsync. The tick's CPU-bound work runs on
//     tokio's blocking pool so it never stalls the async workers, and each
//     pending tick is wrapped in a `futures` `Abortable` so cancellation is a
//     single `abort()`.
// 2.  **ManualTicker**: the host drives ticks itself by calling `fire_next()`
//     whenever its own refresh signal arrives (a UI event loop, or a test).
//
// Cancellation is best effort at this layer: a tick may already be on its way
// when `cancel` runs. The session guards against that with ticket numbers, so a
// late tick is simply ignored.

use crate::error::Result;
use futures::future::{AbortHandle, Abortable};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_REFRESH_RATE_HZ: f64 = 60.0;

/// One deferred cycle.
pub type Tick = Box<dyn FnOnce() + Send + 'static>;

/// A single-shot, cancellable scheduling primitive.
///
/// `schedule_next_cycle` must not run the tick before it returns.
pub trait Scheduler: Send + Sync + 'static {
    type Handle: Send + 'static;

    fn schedule_next_cycle(&self, tick: Tick) -> Self::Handle;

    fn cancel(&self, handle: Self::Handle);
}

impl<S: Scheduler> Scheduler for Arc<S> {
    type Handle = S::Handle;

    fn schedule_next_cycle(&self, tick: Tick) -> Self::Handle {
        (**self).schedule_next_cycle(tick)
    }

    fn cancel(&self, handle: Self::Handle) {
        (**self).cancel(handle)
    }
}

/// Refresh-aligned ticker running on a tokio runtime.
pub struct FrameTicker {
    runtime: tokio::runtime::Handle,
    epoch: Instant,
    period: Duration,
}

/// Pending tick of a `FrameTicker`.
#[derive(Debug)]
pub struct TickHandle(AbortHandle);

impl FrameTicker {
    /// Rates that are non-positive, non-finite, or too slow for a `Duration`
    /// period fall back to `DEFAULT_REFRESH_RATE_HZ`.
    pub fn new(runtime: tokio::runtime::Handle, refresh_rate_hz: f64) -> Self {
        let period = Some(refresh_rate_hz)
            .filter(|hz| hz.is_finite() && *hz > 0.0)
            .and_then(|hz| Duration::try_from_secs_f64(1.0 / hz).ok())
            .filter(|period| !period.is_zero())
            .unwrap_or_else(|| Duration::from_secs_f64(1.0 / DEFAULT_REFRESH_RATE_HZ));
        Self {
            runtime,
            epoch: Instant::now(),
            period,
        }
    }

    /// Ticker bound to the runtime the caller is running on.
    pub fn current(refresh_rate_hz: f64) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()?;
        Ok(Self::new(runtime, refresh_rate_hz))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// The first refresh boundary strictly after `now`.
    fn next_deadline(&self, now: Instant) -> Instant {
        let period = self.period.as_nanos().max(1);
        let elapsed = now.saturating_duration_since(self.epoch).as_nanos();
        let boundary = (elapsed / period + 1).saturating_mul(period);
        let offset = Duration::from_nanos(u64::try_from(boundary).unwrap_or(u64::MAX));
        self.epoch.checked_add(offset).unwrap_or(now + self.period.min(Duration::from_secs(86_400)))
    }
}

impl Scheduler for FrameTicker {
    type Handle = TickHandle;

    fn schedule_next_cycle(&self, tick: Tick) -> TickHandle {
        let (abort, registration) = AbortHandle::new_pair();
        let deadline = tokio::time::Instant::from_std(self.next_deadline(Instant::now()));
        let cycle = async move {
            tokio::time::sleep_until(deadline).await;
            if let Err(e) = tokio::task::spawn_blocking(tick).await {
                tracing::error!("filter cycle panicked: {e}");
            }
        };
        self.runtime.spawn(Abortable::new(cycle, registration));
        TickHandle(abort)
    }

    fn cancel(&self, handle: TickHandle) {
        handle.0.abort();
    }
}

/// Host-driven scheduler. Ticks run on whichever thread calls `fire_next`.
#[derive(Default)]
pub struct ManualTicker {
    queue: Mutex<ManualQueue>,
}

#[derive(Default)]
struct ManualQueue {
    next_id: u64,
    pending: VecDeque<(u64, Tick)>,
}

/// Pending tick of a `ManualTicker`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualHandle(u64);

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ticks waiting to fire.
    pub fn pending(&self) -> usize {
        self.queue.lock().pending.len()
    }

    /// Runs the oldest pending tick. Returns `false` if nothing was pending.
    pub fn fire_next(&self) -> bool {
        // The tick may schedule again, so the queue must be unlocked while it runs.
        let next = self.queue.lock().pending.pop_front();
        match next {
            Some((_, tick)) => {
                tick();
                true
            }
            None => false,
        }
    }
}

impl Scheduler for ManualTicker {
    type Handle = ManualHandle;

    fn schedule_next_cycle(&self, tick: Tick) -> ManualHandle {
        let mut queue = self.queue.lock();
        let id = queue.next_id;
        queue.next_id += 1;
        queue.pending.push_back((id, tick));
        ManualHandle(id)
    }

    fn cancel(&self, handle: ManualHandle) {
        self.queue.lock().pending.retain(|(id, _)| *id != handle.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_tick(counter: &Arc<AtomicUsize>) -> Tick {
        let counter = counter.clone();
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn manual_ticks_fire_in_order_and_cancel_cleanly() {
        let ticker = ManualTicker::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let first = ticker.schedule_next_cycle(counting_tick(&fired));
        let _second = ticker.schedule_next_cycle(counting_tick(&fired));
        assert_eq!(ticker.pending(), 2);

        ticker.cancel(first);
        assert_eq!(ticker.pending(), 1);
        assert!(ticker.fire_next());
        assert!(!ticker.fire_next());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn current_ticker_needs_a_runtime() {
        assert!(FrameTicker::current(60.0).is_err());
    }

    #[tokio::test]
    async fn deadlines_land_on_refresh_boundaries() {
        let ticker = FrameTicker::current(50.0).unwrap();
        assert_eq!(ticker.period(), Duration::from_millis(20));

        let now = ticker.epoch + Duration::from_millis(45);
        let deadline = ticker.next_deadline(now);
        assert_eq!(deadline - ticker.epoch, Duration::from_millis(60));

        let on_boundary = ticker.epoch + Duration::from_millis(40);
        assert_eq!(ticker.next_deadline(on_boundary) - ticker.epoch, Duration::from_millis(60));
    }

    #[tokio::test]
    async fn bad_rates_fall_back_to_default() {
        for hz in [0.0, -5.0, f64::NAN, f64::INFINITY, 1e-20, f64::MIN_POSITIVE] {
            let ticker = FrameTicker::current(hz).unwrap();
            assert_eq!(ticker.period(), Duration::from_secs_f64(1.0 / DEFAULT_REFRESH_RATE_HZ));
        }
    }

    #[tokio::test]
    async fn slow_rates_keep_deadlines_in_the_future() {
        let ticker = FrameTicker::current(1e-12).unwrap();
        assert!(ticker.period() > Duration::from_secs(86_400));
        let now = Instant::now();
        assert!(ticker.next_deadline(now) > now);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn frame_ticker_fires_once_and_cancel_stops_it() {
        let ticker = FrameTicker::current(200.0).unwrap();
        let fired = Arc::new(AtomicUsize::new(0));

        ticker.schedule_next_cycle(counting_tick(&fired));
        let cancelled = ticker.schedule_next_cycle(counting_tick(&fired));
        ticker.cancel(cancelled);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
