//! monitor: background stats logger bound to a cancellation token.
//!
//! One named thread alternates between "wait for tick or cancellation" and
//! "sample once". The thread runs under a child of the caller's token, so
//! cancelling the caller's token stops it at the next tick boundary at the
//! latest. Sampling errors are logged and the loop goes on.
//!
//! Both the timer (`Ticker`) and the sampling step (`Sampler`) are pluggable;
//! `start_stats_monitor` wires the wall-clock ticker and the log sampler.

use log::{error, info, warn};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;
use crate::consts::SYNC_META_DBI;
use crate::engine::{EngineError, Env};
use crate::metrics;
use crate::stats;

const THREAD_NAME: &str = "lightsnap-stats";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Fire,
    Cancelled,
}

/// Source of ticks. Must return `Tick::Cancelled` promptly once `cancel` fires.
pub trait Ticker: Send + 'static {
    fn wait_tick(&mut self, cancel: &CancelToken) -> Tick;
}

/// One sampling step.
pub trait Sampler: Send + 'static {
    fn sample(&mut self, env: &Env) -> Result<(), EngineError>;
}

/// Fixed-rate wall-clock ticker. Missed ticks are dropped, not queued.
pub struct IntervalTicker {
    interval: Duration,
    next: Instant,
}

impl IntervalTicker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now() + interval,
        }
    }
}

impl Ticker for IntervalTicker {
    fn wait_tick(&mut self, cancel: &CancelToken) -> Tick {
        let now = Instant::now();
        let wait = self.next.saturating_duration_since(now);
        if cancel.wait_timeout(wait) {
            return Tick::Cancelled;
        }
        self.next += self.interval;
        let now = Instant::now();
        if self.next <= now {
            self.next = now + self.interval;
        }
        Tick::Fire
    }
}

#[derive(Default)]
struct ManualState {
    pending: u64,
}

/// Ticker driven by explicit `ManualTickerHandle::tick()` calls.
pub struct ManualTicker {
    shared: Arc<(Mutex<ManualState>, Condvar)>,
}

#[derive(Clone)]
pub struct ManualTickerHandle {
    shared: Arc<(Mutex<ManualState>, Condvar)>,
}

impl ManualTicker {
    pub fn new() -> (Self, ManualTickerHandle) {
        let shared = Arc::new((Mutex::new(ManualState::default()), Condvar::new()));
        (
            Self {
                shared: Arc::clone(&shared),
            },
            ManualTickerHandle { shared },
        )
    }
}

impl ManualTickerHandle {
    /// Queue one tick.
    pub fn tick(&self) {
        let (lock, cv) = &*self.shared;
        lock.lock().unwrap_or_else(|e| e.into_inner()).pending += 1;
        cv.notify_all();
    }
}

impl Ticker for ManualTicker {
    fn wait_tick(&mut self, cancel: &CancelToken) -> Tick {
        // ticks and cancellation use different condvars; re-check both every slice
        const SLICE: Duration = Duration::from_millis(5);
        let (lock, cv) = &*self.shared;
        let mut g = lock.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if cancel.is_cancelled() {
                return Tick::Cancelled;
            }
            if g.pending > 0 {
                g.pending -= 1;
                return Tick::Fire;
            }
            g = match cv.wait_timeout(g, SLICE) {
                Ok((g, _)) => g,
                Err(e) => e.into_inner().0,
            };
        }
    }
}

/// Samples with `stats::sample` and writes the result to the log.
pub struct LogSampler {
    skip: Option<String>,
    scrape_smaps: bool,
}

impl LogSampler {
    pub fn new(skip: Option<String>, scrape_smaps: bool) -> Self {
        Self { skip, scrape_smaps }
    }
}

impl Sampler for LogSampler {
    fn sample(&mut self, env: &Env) -> Result<(), EngineError> {
        let s = stats::sample(env, self.skip.as_deref(), self.scrape_smaps)?;
        stats::log_sample(&s);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Zero disables the monitor.
    pub interval: Duration,
    pub scrape_smaps: bool,
    /// Table left out of the per-table detail.
    pub skip_table: Option<String>,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            interval: Duration::ZERO,
            scrape_smaps: false,
            skip_table: Some(SYNC_META_DBI.to_string()),
        }
    }
}

/// Handle of a running monitor. Dropping it detaches the thread, which keeps
/// running until the token it was started with is cancelled.
pub struct StatsMonitor {
    token: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl StatsMonitor {
    /// Start a monitor with an explicit ticker and sampler. Never blocks.
    pub fn start_with<T: Ticker, S: Sampler>(
        parent: &CancelToken,
        env: Env,
        mut ticker: T,
        mut sampler: S,
    ) -> Self {
        let token = parent.child();
        let loop_token = token.clone();
        let spawned = std::thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                loop {
                    if ticker.wait_tick(&loop_token) == Tick::Cancelled {
                        break;
                    }
                    // a tick racing with cancellation must not sample
                    if loop_token.is_cancelled() {
                        break;
                    }
                    match sampler.sample(&env) {
                        Ok(()) => metrics::record_stats_sample(true),
                        Err(e) => {
                            metrics::record_stats_sample(false);
                            warn!("lmdb stats sample failed: {}", e);
                        }
                    }
                }
            });

        let handle = match spawned {
            Ok(h) => Some(h),
            Err(e) => {
                error!("failed to spawn {} thread: {}", THREAD_NAME, e);
                None
            }
        };
        Self { token, handle }
    }

    /// Ask the monitor to stop; it exits at the next tick boundary at the latest.
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// Stop the monitor and wait for an in-flight sample to finish.
    pub fn join(mut self) {
        self.token.cancel();
        if let Some(h) = self.handle.take() {
            if h.join().is_err() {
                error!("{} thread panicked", THREAD_NAME);
            }
        }
    }
}

/// Start the stats logger for `env` with a custom sampler. Returns `None`
/// (and starts nothing) when the interval is zero.
pub fn start_stats_monitor_with<S: Sampler>(
    parent: &CancelToken,
    env: &Env,
    opts: &MonitorOptions,
    sampler: S,
) -> Option<StatsMonitor> {
    if opts.interval.is_zero() {
        info!("lmdb stats logging disabled");
        return None;
    }
    info!("enabled lmdb stats logging interval={:?}", opts.interval);
    Some(StatsMonitor::start_with(
        parent,
        env.clone(),
        IntervalTicker::new(opts.interval),
        sampler,
    ))
}

/// Start the periodic stats logger for `env`.
pub fn start_stats_monitor(
    parent: &CancelToken,
    env: &Env,
    opts: &MonitorOptions,
) -> Option<StatsMonitor> {
    let sampler = LogSampler::new(opts.skip_table.clone(), opts.scrape_smaps);
    start_stats_monitor_with(parent, env, opts, sampler)
}
