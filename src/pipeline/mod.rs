//! Cycle orchestrator: ties scraper → filter → totals → artifact together.
//!
//! One call to [`Pipeline::run_once`] is one complete cycle:
//!   1. Crawl the paginated listing (page failures end pagination early; the
//!      partial item list is still used)
//!   2. Drop items matching the active keyword filters
//!   3. Fetch the total-raised figure and fold in the manual adjustment
//!   4. Overwrite the output artifact
//!   5. Record totals in shared state and announce the new status
//!
//! Nothing in here is allowed to escape as an error: every external call is
//! individually guarded and logged, and the cycle proceeds with whatever
//! partial data it has. The scheduler relies on that.

use crate::artifact::ArtifactWriter;
use crate::filter;
use crate::hub::Hub;
use crate::models::ScrapeOutput;
use crate::scraper::AuctionSource;
use crate::utils::adjusted_total_display;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// One unit of scheduled work. The scheduler only knows this trait; tests
/// drive it with a counting stub.
#[async_trait]
pub trait CycleRunner: Send + Sync {
    async fn run_cycle(&self);
}

pub struct Pipeline {
    hub: Hub,
    source: Arc<dyn AuctionSource>,
    writer: ArtifactWriter,
    source_url: String,
}

impl Pipeline {
    pub fn new(
        hub: Hub,
        source: Arc<dyn AuctionSource>,
        writer: ArtifactWriter,
        source_url: String,
    ) -> Self {
        Self {
            hub,
            source,
            writer,
            source_url,
        }
    }

    pub async fn run_once(&self) -> CycleStats {
        self.hub.log("🚀 Beginning scrape cycle");
        let started = Utc::now();

        let progress = |msg: &str| {
            self.hub.log(msg);
        };

        // 1. Crawl. Never fatal; partial results come back as-is.
        let items = self.source.fetch_items(&progress).await;
        let scraped = items.len();

        // 2. Filter.
        let (kept, rejected) = filter::apply(items, &self.hub.read_filters());
        for (item, term) in &rejected {
            self.hub.log(format!(
                "🚫 Filtered item '{}' (matched '{}')",
                item.title_or_untitled(),
                term
            ));
        }
        if !rejected.is_empty() {
            self.hub
                .log(format!("🧹 Filtered out {} item(s) before saving", rejected.len()));
        }

        // 3. Totals + adjustment.
        let total_raised = self.source.fetch_total_raised(&progress).await;
        let adjustment = self.hub.adjustment();
        let total_display = adjusted_total_display(total_raised.as_deref(), adjustment);

        // 4. Persist the artifact. A write failure is logged, not propagated.
        let output = ScrapeOutput {
            refreshed_at: Utc::now(),
            url: self.source_url.clone(),
            total_items: kept.len(),
            total_raised: total_display.clone(),
            items: kept,
        };
        if let Err(e) = self.writer.write(&output) {
            self.hub
                .log(format!("❌ Error writing {:?}: {:#}", self.writer.path(), e));
        }

        // 5. Record + announce.
        let finished = Utc::now();
        let duration_secs = (finished - started).num_milliseconds() as f64 / 1000.0;
        self.hub.log(format!(
            "🎉 Inventory completed at {} (Duration: {:.2} seconds)",
            finished.format("%Y-%m-%d %H:%M:%S UTC"),
            duration_secs
        ));
        self.hub.log(format!(
            "💾 Saved {} items to {}",
            output.total_items,
            self.writer.path().display()
        ));
        self.hub.log(format!("💰 Total Raised: {}", total_display));
        self.hub.finish_cycle(total_display.clone(), finished);

        let stats = CycleStats {
            items_scraped: scraped,
            items_kept: output.total_items,
            items_filtered: rejected.len(),
            total_raised: total_display,
            duration_secs,
        };
        info!(
            "Cycle done: {} scraped, {} kept, {} filtered, total {}",
            stats.items_scraped, stats.items_kept, stats.items_filtered, stats.total_raised
        );
        stats
    }
}

#[async_trait]
impl CycleRunner for Pipeline {
    async fn run_cycle(&self) {
        self.run_once().await;
    }
}

#[derive(Debug)]
pub struct CycleStats {
    pub items_scraped: usize,
    pub items_kept: usize,
    pub items_filtered: usize,
    pub total_raised: String,
    pub duration_secs: f64,
}
