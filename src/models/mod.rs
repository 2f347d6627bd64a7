use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Auction item ──────────────────────────────────────────────────────────────

/// One card scraped from the listing pages. Only `title` is consulted by the
/// filter engine; every other field passes through to the artifact untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuctionItem {
    pub title: Option<String>,
    pub picture_url: Option<String>,
    pub price: Option<String>,
    pub remaining: Option<String>,
    pub value: Option<String>,
    pub bids: Option<String>,
}

impl AuctionItem {
    pub fn title_or_untitled(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }
}

// ── Log entry ─────────────────────────────────────────────────────────────────

/// One line of the in-memory operational feed. Timestamps have second
/// precision; sequence order, not the timestamp, is authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub timestamp: String,
    pub message: String,
}

impl LogEntry {
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            message: message.into(),
        }
    }
}

// ── Status snapshot ───────────────────────────────────────────────────────────

/// Point-in-time copy of the operational status. Always a value, never a live
/// reference, so publishing a snapshot cannot race with later mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusSnapshot {
    /// Seconds until the next cycle; `None` while refresh is paused.
    pub next_refresh_in: Option<u64>,
    pub last_total: Option<String>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub refresh_paused: bool,
    pub manual_adjustment: f64,
    pub filters: Vec<String>,
    pub refresh_interval: u64,
}

// ── Events ────────────────────────────────────────────────────────────────────

/// Fan-out payload delivered to live subscribers. Transient — never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Status(StatusSnapshot),
    Log(LogEntry),
    Ping,
}

impl Event {
    /// Wire name used for SSE framing.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Status(_) => "status",
            Event::Log(_) => "log",
            Event::Ping => "ping",
        }
    }
}

// ── Scrape output artifact ────────────────────────────────────────────────────

/// The externally persisted result of one cycle. Regenerated wholesale each
/// time — there is no incremental merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeOutput {
    pub refreshed_at: DateTime<Utc>,
    pub url: String,
    pub total_items: usize,
    pub total_raised: String,
    pub items: Vec<AuctionItem>,
}
