use crate::models::AuctionItem;
use anyhow::Result;
use scraper::{Html, Selector};

// ── Listing page ──────────────────────────────────────────────────────────────

/// Extract the item cards and the next-page href (if any) from one listing
/// page. Cards missing their inner `.card` wrapper are skipped.
pub fn parse_listing_page(html: &str) -> Result<(Vec<AuctionItem>, Option<String>)> {
    let doc = Html::parse_document(html);

    let item_sel = sel("a.item")?;
    let card_sel = sel(".card")?;
    let img_sel = sel(".img-section img")?;
    let title_sel = sel("h5.text-truncate-2.narrow")?;
    let price_sel = sel("h6.text-truncate")?;
    let meta_sel = sel("div.card-text.small.text-truncate.text-muted")?;

    let mut items = Vec::new();

    for anchor in doc.select(&item_sel) {
        let Some(card) = anchor.select(&card_sel).next() else {
            continue;
        };

        let picture_url = card
            .select(&img_sel)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(|s| s.to_string());

        let title = card
            .select(&title_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string());

        let price = card
            .select(&price_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string());

        // Remaining / Value / Bids share one muted-text class and are
        // distinguished by their label prefix.
        let mut remaining = None;
        let mut value = None;
        let mut bids = None;
        for div in card.select(&meta_sel) {
            let text = div.text().collect::<String>().trim().to_lowercase();
            if let Some(rest) = text.strip_prefix("remaining:") {
                remaining = Some(rest.trim().to_string());
            } else if let Some(rest) = text.strip_prefix("value:") {
                value = Some(rest.trim().to_string());
            } else if let Some(rest) = text.strip_prefix("bids:") {
                bids = Some(rest.trim().to_string());
            }
        }

        items.push(AuctionItem {
            title,
            picture_url,
            price,
            remaining,
            value,
            bids,
        });
    }

    let next_href = find_next_href(&doc)?;
    Ok((items, next_href))
}

/// Href of the pagination "next" link, when present.
fn find_next_href(doc: &Html) -> Result<Option<String>> {
    let next_sel = sel("ul.pagination li.next a.page-link, ul.pagination li.next a[rel=\"next\"]")?;
    Ok(doc
        .select(&next_sel)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|h| h.to_string()))
}

// ── Summary page ──────────────────────────────────────────────────────────────

/// The raw total-raised text from the auction summary page.
pub fn parse_total_raised(html: &str) -> Result<Option<String>> {
    let doc = Html::parse_document(html);
    let amt_sel = sel("div.raised.amt")?;
    Ok(doc
        .select(&amt_sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty()))
}

fn sel(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow::anyhow!("selector {:?}: {:?}", selector, e))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
        <a class="item" href="/items/1">
          <div class="card">
            <div class="img-section"><img src="/img/basket.jpg"></div>
            <h5 class="text-truncate-2 narrow">Gift Basket</h5>
            <h6 class="text-truncate">$25.00</h6>
            <div class="card-text small text-truncate text-muted">Remaining: 2d 4h</div>
            <div class="card-text small text-truncate text-muted">Value: $40.00</div>
            <div class="card-text small text-truncate text-muted">Bids: 3</div>
          </div>
        </a>
        <a class="item" href="/items/2">
          <div class="card">
            <h5 class="text-truncate-2 narrow">Raffle Ticket</h5>
          </div>
        </a>
        <a class="item" href="/items/3"><span>no card wrapper</span></a>
        <ul class="pagination">
          <li class="next"><a class="page-link" href="?page=2">Next</a></li>
        </ul>
        </body></html>
    "#;

    #[test]
    fn test_parse_listing_page() {
        let (items, next) = parse_listing_page(LISTING).unwrap();
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.title.as_deref(), Some("Gift Basket"));
        assert_eq!(first.picture_url.as_deref(), Some("/img/basket.jpg"));
        assert_eq!(first.price.as_deref(), Some("$25.00"));
        assert_eq!(first.remaining.as_deref(), Some("2d 4h"));
        assert_eq!(first.value.as_deref(), Some("$40.00"));
        assert_eq!(first.bids.as_deref(), Some("3"));

        let second = &items[1];
        assert_eq!(second.title.as_deref(), Some("Raffle Ticket"));
        assert_eq!(second.picture_url, None);

        assert_eq!(next.as_deref(), Some("?page=2"));
    }

    #[test]
    fn test_last_page_has_no_next() {
        let html = r#"<html><body><ul class="pagination"><li class="prev">
            <a class="page-link" href="?page=1">Prev</a></li></ul></body></html>"#;
        let (items, next) = parse_listing_page(html).unwrap();
        assert!(items.is_empty());
        assert_eq!(next, None);
    }

    #[test]
    fn test_parse_total_raised() {
        let html = r#"<html><body><div class="raised amt"> $4,520.00 </div></body></html>"#;
        assert_eq!(
            parse_total_raised(html).unwrap().as_deref(),
            Some("$4,520.00")
        );

        let html = r#"<html><body><div class="other">nothing</div></body></html>"#;
        assert_eq!(parse_total_raised(html).unwrap(), None);
    }
}
