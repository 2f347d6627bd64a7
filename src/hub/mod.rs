//! The operation surface shared by the scheduler, the scrape cycle, and the
//! HTTP handlers: reads and mutations of [`SharedState`] paired with the
//! event fan-out that reports them.
//!
//! Every mutating control operation appends a human-readable audit line and
//! publishes a fresh status snapshot. Event publication happens after the
//! state mutation it reports, on the calling thread.

use crate::bus::{EventBus, Subscriber};
use crate::models::{Event, LogEntry, StatusSnapshot};
use crate::state::{Controls, SharedState};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct Hub {
    state: Arc<SharedState>,
    controls: Arc<Controls>,
    bus: EventBus,
    interval_secs: u64,
}

impl Hub {
    pub fn new(interval_secs: u64) -> Self {
        Self {
            state: Arc::new(SharedState::new(interval_secs)),
            controls: Arc::new(Controls::default()),
            bus: EventBus::new(),
            interval_secs,
        }
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    /// Compose a point-in-time snapshot. Locks are taken one at a time in a
    /// fixed order; fields are independently meaningful, so a reader may see
    /// e.g. a fresh adjustment next to a stale last_total.
    pub fn read_status(&self) -> StatusSnapshot {
        let (next_refresh_in, last_total, last_refresh) = self.state.status_fields();
        let refresh_paused = self.controls.is_paused();
        let manual_adjustment = self.state.adjustment();
        let filters = self.state.filters();
        StatusSnapshot {
            next_refresh_in,
            last_total,
            last_refresh,
            refresh_paused,
            manual_adjustment,
            filters,
            refresh_interval: self.interval_secs,
        }
    }

    pub fn read_logs(&self) -> Vec<LogEntry> {
        self.state.logs()
    }

    pub fn read_filters(&self) -> Vec<String> {
        self.state.filters()
    }

    pub fn adjustment(&self) -> f64 {
        self.state.adjustment()
    }

    pub fn subscribe(&self) -> Subscriber {
        self.bus.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }

    // ── Feed ──────────────────────────────────────────────────────────────────

    /// Append to the log ring, mirror the line to the tracing output, and fan
    /// the entry out to subscribers.
    pub fn log(&self, message: impl Into<String>) -> LogEntry {
        let entry = self.state.append_log(message);
        debug!("{}", entry.message);
        self.bus.publish(&Event::Log(entry.clone()));
        entry
    }

    /// Publish a fresh status snapshot to all subscribers.
    pub fn publish_status(&self) -> StatusSnapshot {
        let snapshot = self.read_status();
        self.bus.publish(&Event::Status(snapshot.clone()));
        snapshot
    }

    // ── Scheduler-side mutations ──────────────────────────────────────────────

    /// Countdown updates are written without publishing; observers poll these
    /// via /status or pick them up with the next published snapshot.
    pub fn set_countdown(&self, seconds: Option<u64>) {
        self.state.set_next_refresh(seconds);
    }

    /// Record a finished cycle and announce the new status.
    pub fn finish_cycle(&self, total_display: String, finished: DateTime<Utc>) {
        self.state
            .record_cycle(total_display, finished, self.interval_secs);
        self.publish_status();
    }

    // ── Control operations ────────────────────────────────────────────────────

    pub fn set_adjustment(&self, amount: f64) {
        self.state.set_adjustment(amount);
        self.log(format!("Manual adjustment set to {:+.2}", amount));
        self.publish_status();
    }

    /// Replace the filter set. Terms arrive pre-validated: trimmed, non-empty.
    pub fn set_filters(&self, terms: Vec<String>) {
        let display = if terms.is_empty() {
            "none".to_string()
        } else {
            terms.join(", ")
        };
        self.state.set_filters(terms);
        self.log(format!("Filters updated: {}", display));
        self.publish_status();
    }

    pub fn pause(&self) {
        self.controls.set_paused(true);
        self.state.set_next_refresh(None);
        self.log("⏸️ Refresh paused");
        self.publish_status();
    }

    pub fn resume(&self) {
        self.controls.set_paused(false);
        self.state.set_next_refresh(Some(self.interval_secs));
        self.log("▶️ Refresh resumed");
        self.publish_status();
    }

    pub fn trigger_now(&self) {
        self.controls.request_trigger();
        self.state.set_next_refresh(Some(0));
        self.log("🔁 Manual refresh requested");
        self.publish_status();
    }
}
