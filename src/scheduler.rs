use crate::cue::Cue;
use crate::resolver::resolve;

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

/// What every task sees on a tick.
#[derive(Debug, Clone, Copy)]
pub struct TickInfo<'a> {
    pub time: u64,
    pub current_cue: Option<&'a Cue>,
    pub cue_changed: bool,
}

pub type Task = Box<dyn FnMut(&TickInfo<'_>) -> anyhow::Result<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub time: u64,
    pub cue_changed: bool,
    pub failed_tasks: usize,
}

/// Periodic sampler owning the active cue and the registered tasks.
///
/// The timer is created by the first registration and lives as long as the
/// scheduler; there is never more than one.
pub struct Scheduler {
    period: Duration,
    ticker: Option<Interval>,
    tasks: Vec<(TaskHandle, Task)>,
    next_handle: u64,
    current: Option<Cue>,
    // Set when a shown cue was dropped by `reset_active`.
    stale: bool,
}

impl Scheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            ticker: None,
            tasks: Vec::new(),
            next_handle: 0,
            current: None,
            stale: false,
        }
    }

    /// Appends a task and starts the timer if it is not running yet.
    ///
    /// # Panics
    ///
    /// Starting the timer panics when called outside a tokio runtime with
    /// the time driver enabled.
    pub fn register<F>(&mut self, task: F) -> TaskHandle
    where
        F: FnMut(&TickInfo<'_>) -> anyhow::Result<()> + 'static,
    {
        let handle = TaskHandle(self.next_handle);
        self.next_handle += 1;
        self.tasks.push((handle, Box::new(task)));

        if self.ticker.is_none() {
            debug!(period_ms = self.period.as_millis() as u64, "starting tick timer");
            let mut ticker = interval_at(Instant::now() + self.period, self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.ticker = Some(ticker);
        }
        handle
    }

    /// Removes a task. The timer keeps running even when no task is left.
    pub fn unregister(&mut self, handle: TaskHandle) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|(h, _)| *h != handle);
        before != self.tasks.len()
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn current_cue(&self) -> Option<&Cue> {
        self.current.as_ref()
    }

    /// Forgets the active cue, for when the loaded cues are replaced. If a
    /// cue was active, the next tick reports a change even when no cue
    /// covers the playback time, so tasks can drop what they show.
    pub fn reset_active(&mut self) {
        self.stale |= self.current.take().is_some();
    }

    /// Resolves once the next tick is due. Never resolves before the first
    /// registration.
    pub async fn next_tick(&mut self) {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => std::future::pending().await,
        }
    }

    /// Runs one tick at playback time `time_ms` against `cues`.
    ///
    /// Tasks run in registration order. A failing task is logged and does
    /// not keep the others from running.
    pub fn tick(&mut self, time_ms: u64, cues: &[Cue]) -> TickSummary {
        let res = resolve(time_ms, self.current.as_ref(), cues);
        let cue_changed = res.changed || std::mem::take(&mut self.stale);
        let next = res.cue.cloned();
        self.current = next;

        if cue_changed {
            debug!(
                time_ms,
                cue = self.current.as_ref().map(|c| c.text.as_str()),
                "active cue changed"
            );
        }

        let info = TickInfo {
            time: time_ms,
            current_cue: self.current.as_ref(),
            cue_changed,
        };
        let mut failed_tasks = 0;
        for (handle, task) in self.tasks.iter_mut() {
            if let Err(err) = task(&info) {
                failed_tasks += 1;
                warn!(task = handle.0, time_ms, "task failed: {:#}", err);
            }
        }

        TickSummary {
            time: time_ms,
            cue_changed,
            failed_tasks,
        }
    }
}
