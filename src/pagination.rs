//! Multi-page collection of search results.

use std::time::Duration;

use log::{info, warn};
use url::Url;

use crate::browser::Page;
use crate::config::Config;
use crate::delay_manager;
use crate::error::Result;
use crate::extractor::extract_all;
use crate::models::{JobSummary, SearchCriteria};
use crate::session::Session;
use crate::sites::SiteAdapter;

/// Sets the page-number query parameter `key` to `page`, leaving every other
/// parameter exactly as it was (including its encoding). The result carries
/// exactly one `key`; the fragment is kept.
pub fn with_page_param(url: &str, key: &str, page: u32) -> Result<String> {
    let mut parsed = Url::parse(url)?;
    let query = parsed.query().unwrap_or_default().to_string();
    let replacement = format!("{}={}", key, page);

    let mut segments: Vec<&str> = Vec::new();
    let mut placed = false;
    for segment in query.split('&').filter(|s| !s.is_empty()) {
        let name = segment.split('=').next().unwrap_or_default();
        if name == key {
            if !placed {
                segments.push(&replacement);
                placed = true;
            }
            continue;
        }
        segments.push(segment);
    }
    if !placed {
        segments.push(&replacement);
    }

    parsed.set_query(Some(&segments.join("&")));
    Ok(parsed.into())
}

/// Whether at least one result card shows up within `timeout`.
pub fn has_listings(page: &dyn Page, card_css: &str, timeout: Duration) -> bool {
    page.wait_for(card_css, timeout)
        && page.find_all(card_css).map(|cards| !cards.is_empty()).unwrap_or(false)
}

/// Runs a search and, when asked, walks further pages.
///
/// Further pages are fetched only while the page number is below
/// `max_pages`, the previous page yielded something and the new page is
/// confirmed to have listings. Whatever was gathered before a navigation
/// failure is kept.
pub fn collect(
    session: &mut Session,
    adapter: &dyn SiteAdapter,
    criteria: &SearchCriteria,
    config: &Config,
) -> Result<Vec<JobSummary>> {
    let url = adapter.search_url(criteria);
    info!("Searching {}: {}", adapter.name(), url);
    session.page_mut().navigate(&url)?;
    delay_manager::page_delay(config.page_wait);

    if adapter.dismiss_page_artifacts(session.page(), config) {
        session.persist_cookies();
    }

    let layout = adapter.card_layout();
    let mut results = extract_all(session.page(), layout, config.element_timeout);
    let mut last_yield = results.len();
    let mut current = criteria.page;

    if criteria.fetch_all_pages {
        while current < criteria.max_pages && last_yield > 0 {
            current += 1;
            let next = match with_page_param(&session.page().current_url(), adapter.page_param(), current) {
                Ok(next) => next,
                Err(e) => {
                    warn!("Cannot build URL for page {}: {}", current, e);
                    break;
                }
            };
            if let Err(e) = session.page_mut().navigate(&next) {
                warn!("Error navigating to page {}: {}", current, e);
                break;
            }
            delay_manager::page_delay(config.page_wait);

            if !has_listings(session.page(), layout.card, config.presence_timeout) {
                info!("No job listings on page {}, stopping", current);
                break;
            }
            let batch = extract_all(session.page(), layout, config.element_timeout);
            if !batch.is_empty() {
                info!("Added {} jobs from page {}", batch.len(), current);
            }
            last_yield = batch.len();
            results.extend(batch);
        }
    }

    session.persist_cookies();
    Ok(results)
}
