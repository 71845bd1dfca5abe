//! Reply monitor bookkeeping: the per-tab timer slot and the tick verdicts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use promptrelay_core::AgentSettings;
use tokio::task::JoinHandle;

/// Holds the single monitor task of a tab.
#[derive(Default)]
pub(crate) struct MonitorSlot {
    handle: Mutex<Option<JoinHandle<()>>>,
    live: Arc<AtomicUsize>,
}

/// Counts a running monitor; dropped when the task ends or is aborted.
pub(crate) struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MonitorSlot {
    /// Register a monitor about to start. Move the guard into the task.
    pub(crate) fn enter(&self) -> LiveGuard {
        self.live.fetch_add(1, Ordering::SeqCst);
        LiveGuard(self.live.clone())
    }

    /// Install `handle`, aborting whatever monitor ran before.
    pub(crate) fn replace(&self, handle: JoinHandle<()>) {
        if let Some(previous) = self.handle.lock().replace(handle) {
            previous.abort();
        }
    }

    pub(crate) fn stop(&self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }

    /// Monitors currently running for this tab.
    pub(crate) fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// What one monitor tick concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Nothing,
    Busy,
    Ready,
    /// No progress signal for a while on a site that throttles background tabs.
    Stalled,
    TimedOut,
}

/// Tick counters of one monitoring cycle.
#[derive(Debug)]
pub(crate) struct MonitorState {
    ticks: u32,
    stalled: u32,
    ceiling: u32,
    grace: u32,
    threshold: u32,
    watch_stalls: bool,
}

impl MonitorState {
    pub(crate) fn new(settings: &AgentSettings, watch_stalls: bool) -> Self {
        Self {
            ticks: 0,
            stalled: 0,
            ceiling: settings.monitor_ceiling,
            grace: settings.stall_grace,
            threshold: settings.stall_threshold,
            watch_stalls,
        }
    }

    /// Classify one tick given what the page currently shows.
    pub(crate) fn observe(&mut self, busy: bool, ready: bool) -> Verdict {
        self.ticks += 1;
        if self.ticks > self.ceiling {
            return Verdict::TimedOut;
        }
        if busy {
            self.stalled = 0;
            return Verdict::Busy;
        }
        if ready {
            return Verdict::Ready;
        }
        if self.watch_stalls && self.ticks > self.grace {
            self.stalled += 1;
            if self.stalled > self.threshold {
                return Verdict::Stalled;
            }
        }
        Verdict::Nothing
    }
}
