//! Live ticking of one task's elapsed time

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::tracking::elapsed::compute_live_elapsed;
use crate::tracking::models::{AppConfig, LiveElapsed, Task};

/// Default refresh interval for a ticking task
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Source of "now" for elapsed-time computation
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Observes one task and keeps its [`LiveElapsed`] value current.
///
/// While the observed task is in progress a tokio task recomputes the value
/// once per tick and publishes it on a watch channel. Observing an inactive
/// snapshot, calling [`stop`](Self::stop) or dropping the tracker aborts the
/// ticker, so no timer outlives its observer.
///
/// `observe` spawns onto the current tokio runtime and must be called from
/// within one.
pub struct LiveElapsedTracker {
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
    sender: Arc<watch::Sender<LiveElapsed>>,
    ticker: Option<JoinHandle<()>>,
}

impl Default for LiveElapsedTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveElapsedTracker {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), DEFAULT_TICK_INTERVAL)
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let tick_interval = Duration::from_millis(config.tick_interval_ms.max(1));
        Self::with_clock(Arc::new(SystemClock), tick_interval)
    }

    pub fn with_clock(clock: Arc<dyn Clock>, tick_interval: Duration) -> Self {
        let (sender, _) = watch::channel(LiveElapsed::default());
        Self {
            clock,
            tick_interval,
            sender: Arc::new(sender),
            ticker: None,
        }
    }

    /// Receive every published value
    pub fn subscribe(&self) -> watch::Receiver<LiveElapsed> {
        self.sender.subscribe()
    }

    /// Latest published value
    pub fn current(&self) -> LiveElapsed {
        self.sender.borrow().clone()
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Switch to a new snapshot of the observed task.
    ///
    /// The value for the snapshot is published immediately. Ticking starts
    /// only when the task is in progress with a usable open session.
    pub fn observe(&mut self, task: &Task) {
        self.stop();

        let value = compute_live_elapsed(task, self.clock.now());
        let should_tick = value.is_active && !value.open_session_missing;
        self.sender.send_replace(value);

        if !should_tick {
            return;
        }

        let task = task.clone();
        let clock = self.clock.clone();
        let sender = self.sender.clone();
        let tick_interval = self.tick_interval;

        self.ticker = Some(tokio::spawn(async move {
            let mut ticker = interval(tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // Skip the first tick (immediate), the value was just published
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let value = compute_live_elapsed(&task, clock.now());
                let still_active = value.is_active;
                sender.send_replace(value);

                if !still_active {
                    break;
                }
            }
        }));

        log::debug!("Started live ticker every {:?}", self.tick_interval);
    }

    /// Cancel the ticker, keeping the last published value.
    pub fn stop(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
            log::debug!("Stopped live ticker");
        }
    }
}

impl Drop for LiveElapsedTracker {
    fn drop(&mut self) {
        self.stop();
    }
}
