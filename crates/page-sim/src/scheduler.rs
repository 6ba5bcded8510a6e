//! Virtual-time timer queue.

use std::collections::BTreeMap;

use gazelens_common::clock::TimestampMs;
use gazelens_platform_core::{Scheduler, TimerTask};

/// Scheduler whose timers fire only when the caller advances time.
///
/// Tasks due at the same instant come back in scheduling order.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now_ms: TimestampMs,
    next_seq: u64,
    queue: BTreeMap<(TimestampMs, u64), TimerTask>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now_ms(&self) -> TimestampMs {
        self.now_ms
    }

    /// Advance virtual time and return every task that became due.
    ///
    /// Time never moves backwards; an earlier `now_ms` is ignored.
    pub fn advance_to(&mut self, now_ms: TimestampMs) -> Vec<TimerTask> {
        self.now_ms = self.now_ms.max(now_ms);
        let later = self.queue.split_off(&(self.now_ms.saturating_add(1), 0));
        let due = std::mem::replace(&mut self.queue, later);
        due.into_values().collect()
    }

    /// Number of timers not yet fired.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Deadline of the earliest pending timer.
    pub fn next_deadline(&self) -> Option<TimestampMs> {
        self.queue.keys().next().map(|(due, _)| *due)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_after(&mut self, delay_ms: u64, task: TimerTask) {
        let due = self.now_ms.saturating_add(delay_ms);
        self.queue.insert((due, self.next_seq), task);
        self.next_seq += 1;
    }
}
