pub mod http_client;
pub mod parsers;

use crate::config::ScraperConfig;
use crate::models::AuctionItem;
use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use self::http_client::HttpClient;
use self::parsers::{parse_listing_page, parse_total_raised};

/// Sink for per-item and per-page progress lines; the cycle wires this to the
/// observable log feed.
pub type ProgressFn<'a> = dyn Fn(&str) + Send + Sync + 'a;

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable listing source abstraction.
///
/// `fetch_items` must never fail the cycle: page-level errors are reported via
/// `progress` and terminate pagination early, returning whatever was collected.
#[async_trait]
pub trait AuctionSource: Send + Sync {
    async fn fetch_items(&self, progress: &ProgressFn) -> Vec<AuctionItem>;
    async fn fetch_total_raised(&self, progress: &ProgressFn) -> Option<String>;
}

// ── 32auctions scraper ────────────────────────────────────────────────────────

pub struct ThirtyTwoScraper {
    client: HttpClient,
    listing_url: String,
    summary_url: String,
    max_pages: u32,
}

impl ThirtyTwoScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config)?,
            listing_url: config.listing_url.clone(),
            summary_url: config.summary_url.clone(),
            max_pages: config.max_pages,
        })
    }

    pub fn listing_url(&self) -> &str {
        &self.listing_url
    }

    /// Resolve a (possibly relative) next-page href against the current page.
    fn resolve_next(current: &str, href: &str) -> Option<String> {
        let base = Url::parse(current).ok()?;
        let joined = base.join(href).ok()?;
        Some(joined.to_string())
    }
}

#[async_trait]
impl AuctionSource for ThirtyTwoScraper {
    async fn fetch_items(&self, progress: &ProgressFn) -> Vec<AuctionItem> {
        let mut items = Vec::new();
        let mut seen_pages = std::collections::HashSet::new();
        let mut next_url = Some(self.listing_url.clone());
        let mut pages = 0u32;

        while let Some(url) = next_url.take() {
            // A repeated URL means the pagination links loop back; stop.
            if !seen_pages.insert(url.clone()) {
                break;
            }

            pages += 1;
            if pages > self.max_pages {
                warn!("Reached page limit ({}), stopping", self.max_pages);
                break;
            }

            let html = match self.client.get_text(&url).await {
                Ok(html) => html,
                Err(e) => {
                    // Partial results from earlier pages are still used.
                    progress(&format!("❌ Error fetching {}: {:#}", url, e));
                    break;
                }
            };

            let (page_items, next_href) = match parse_listing_page(&html) {
                Ok(parsed) => parsed,
                Err(e) => {
                    progress(&format!("❌ Error parsing {}: {:#}", url, e));
                    break;
                }
            };

            debug!("Page {}: {} items", pages, page_items.len());

            for item in page_items {
                let title: String = item.title_or_untitled().chars().take(60).collect();
                progress(&format!("🔍 Found: {}", title));
                items.push(item);
            }

            next_url = next_href.and_then(|href| Self::resolve_next(&url, &href));
        }

        progress(&format!("🔍 Scrape collected {} items", items.len()));
        items
    }

    async fn fetch_total_raised(&self, progress: &ProgressFn) -> Option<String> {
        let html = match self.client.get_text(&self.summary_url).await {
            Ok(html) => html,
            Err(e) => {
                progress(&format!("❌ Error fetching total raised: {:#}", e));
                return None;
            }
        };

        match parse_total_raised(&html) {
            Ok(total) => total,
            Err(e) => {
                progress(&format!("❌ Error parsing total raised: {:#}", e));
                None
            }
        }
    }
}
