use std::time::{Duration, Instant};
use tracing::info;

/// A simple wall-clock timer for logging elapsed time.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        info!("⏱  Starting: {}", label);
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!(
            "⏱  Finished: {} (took {:.2?})",
            self.label,
            self.start.elapsed()
        );
    }
}

// ── Money helpers ─────────────────────────────────────────────────────────────

/// Parse a fetched total like "$1,234.56" by stripping the currency symbol and
/// grouping separators. Free-text totals ("TBD") fail the parse and take the
/// fallback display path instead.
pub fn parse_money(s: &str) -> Option<f64> {
    let cleaned = s.replace('$', "").replace(',', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// Format a dollar amount with thousands separators and two decimals.
/// 1234.5 → "$1,234.50"
pub fn format_usd(amount: f64) -> String {
    let negative = amount < 0.0;
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let int_grouped: String = grouped.chars().rev().collect();

    if negative {
        format!("$-{}.{}", int_grouped, frac_part)
    } else {
        format!("${}.{}", int_grouped, frac_part)
    }
}

/// Combine a fetched total with the manual adjustment into the display string.
/// Numeric totals get a combined numeric display; non-numeric text keeps the
/// raw value with a signed adjustment suffix; a missing total counts as zero.
pub fn adjusted_total_display(total_raised: Option<&str>, adjustment: f64) -> String {
    match total_raised {
        Some(raw) => match parse_money(raw) {
            Some(value) => format_usd(value + adjustment),
            None => format!("{} ({:+.2})", raw, adjustment),
        },
        None => format_usd(adjustment),
    }
}
