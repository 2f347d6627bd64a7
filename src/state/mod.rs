//! Shared mutable state: the single source of truth for operational status
//! and the bounded log ring.
//!
//! Each field group sits behind its own mutex so a slow reader of one field
//! never blocks writers of another. Snapshots are composed by taking the locks
//! in a fixed order (status → pause flag → adjustment → filters), releasing
//! each before the next is taken. Strict cross-field consistency is not
//! required; per-field atomicity is.

use crate::models::LogEntry;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Log ring capacity; oldest entries are evicted FIFO past this.
pub const MAX_LOGS: usize = 200;

#[derive(Debug, Default)]
struct StatusFields {
    next_refresh_in: Option<u64>,
    last_total: Option<String>,
    last_refresh: Option<DateTime<Utc>>,
}

/// Operational state shared between the scheduler and the request handlers.
#[derive(Debug)]
pub struct SharedState {
    status: Mutex<StatusFields>,
    adjustment: Mutex<f64>,
    filters: Mutex<Vec<String>>,
    logs: Mutex<VecDeque<LogEntry>>,
}

impl SharedState {
    pub fn new(interval_secs: u64) -> Self {
        Self {
            status: Mutex::new(StatusFields {
                next_refresh_in: Some(interval_secs),
                ..StatusFields::default()
            }),
            adjustment: Mutex::new(0.0),
            filters: Mutex::new(Vec::new()),
            logs: Mutex::new(VecDeque::with_capacity(MAX_LOGS)),
        }
    }

    // ── Status fields ─────────────────────────────────────────────────────────

    pub fn set_next_refresh(&self, seconds: Option<u64>) {
        self.status.lock().expect("status lock").next_refresh_in = seconds;
    }

    /// Record the outcome of a finished cycle in one lock acquisition.
    pub fn record_cycle(&self, total: String, finished: DateTime<Utc>, interval_secs: u64) {
        let mut status = self.status.lock().expect("status lock");
        status.last_total = Some(total);
        status.last_refresh = Some(finished);
        status.next_refresh_in = Some(interval_secs);
    }

    pub fn status_fields(&self) -> (Option<u64>, Option<String>, Option<DateTime<Utc>>) {
        let status = self.status.lock().expect("status lock");
        (
            status.next_refresh_in,
            status.last_total.clone(),
            status.last_refresh,
        )
    }

    // ── Adjustment ────────────────────────────────────────────────────────────

    pub fn set_adjustment(&self, amount: f64) {
        *self.adjustment.lock().expect("adjustment lock") = amount;
    }

    pub fn adjustment(&self) -> f64 {
        *self.adjustment.lock().expect("adjustment lock")
    }

    // ── Filters ───────────────────────────────────────────────────────────────

    /// Replace the whole filter set atomically; the old set is discarded.
    pub fn set_filters(&self, terms: Vec<String>) {
        *self.filters.lock().expect("filters lock") = terms;
    }

    pub fn filters(&self) -> Vec<String> {
        self.filters.lock().expect("filters lock").clone()
    }

    // ── Log ring ──────────────────────────────────────────────────────────────

    /// Timestamp, append, evict-if-over-cap. Returns the created entry.
    pub fn append_log(&self, message: impl Into<String>) -> LogEntry {
        let entry = LogEntry::now(message);
        let mut logs = self.logs.lock().expect("logs lock");
        logs.push_back(entry.clone());
        while logs.len() > MAX_LOGS {
            logs.pop_front();
        }
        entry
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.logs.lock().expect("logs lock").iter().cloned().collect()
    }
}

// ── Scheduler controls ────────────────────────────────────────────────────────

/// Pause/trigger request flags plus a notifier that wakes the scheduler out of
/// its countdown sleep. Handlers only *request* state changes here; the
/// scheduler is the sole consumer of the trigger flag.
#[derive(Debug, Default)]
pub struct Controls {
    paused: AtomicBool,
    trigger: AtomicBool,
    signal: Notify,
}

impl Controls {
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
        self.signal.notify_one();
    }

    pub fn request_trigger(&self) {
        self.trigger.store(true, Ordering::SeqCst);
        self.signal.notify_one();
    }

    /// Consume a pending trigger, if any. At most one cycle fires per request.
    pub fn take_trigger(&self) -> bool {
        self.trigger.swap(false, Ordering::SeqCst)
    }

    /// Wait until a control operation signals. A signal that raced ahead of
    /// the wait is not lost: `notify_one` stores a permit.
    pub async fn signalled(&self) {
        self.signal.notified().await;
    }
}
