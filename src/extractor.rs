use std::time::Duration;

use log::{debug, info, warn};
use url::Url;

use crate::browser::{Element, Page};
use crate::error::Result;
use crate::models::JobSummary;

/// How a field value is read once its element is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Whole visible text, trimmed.
    Text,
    /// The n-th non-blank line of the visible text.
    Line(usize),
    Attribute(&'static str),
    /// `href`, resolved against the page URL.
    Link,
}

/// Selector relative to the card root plus the way its value is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub css: &'static str,
    pub source: FieldSource,
}

impl FieldRule {
    pub const fn text(css: &'static str) -> Self {
        FieldRule { css, source: FieldSource::Text }
    }

    pub const fn line(css: &'static str, index: usize) -> Self {
        FieldRule { css, source: FieldSource::Line(index) }
    }

    pub const fn attribute(css: &'static str, name: &'static str) -> Self {
        FieldRule { css, source: FieldSource::Attribute(name) }
    }

    pub const fn link(css: &'static str) -> Self {
        FieldRule { css, source: FieldSource::Link }
    }
}

/// Where result cards live on a listing page and how to read each field.
#[derive(Debug, Clone, Copy)]
pub struct CardLayout {
    pub card: &'static str,
    pub title: Option<FieldRule>,
    pub company: Option<FieldRule>,
    pub location: Option<FieldRule>,
    pub link: Option<FieldRule>,
}

/// Reads every card on the current page, in page order.
///
/// A card that goes stale mid-read is dropped and the rest continue. A field
/// whose selector misses stays `None`; the card is still kept.
pub fn extract_all(page: &dyn Page, layout: &CardLayout, timeout: Duration) -> Vec<JobSummary> {
    if !page.wait_for(layout.card, timeout) {
        warn!("Timeout waiting for job cards ({})", layout.card);
        return Vec::new();
    }

    let base = Url::parse(&page.current_url()).ok();
    let cards = match page.find_all(layout.card) {
        Ok(cards) => cards,
        Err(e) => {
            warn!("Could not list job cards: {}", e);
            return Vec::new();
        }
    };
    info!("Found {} job cards", cards.len());

    let mut jobs = Vec::with_capacity(cards.len());
    for (index, card) in cards.iter().enumerate() {
        match read_card(card.as_ref(), layout, base.as_ref()) {
            Ok(job) => {
                if job.is_empty() {
                    debug!("Card {} has no readable fields", index + 1);
                }
                jobs.push(job);
            }
            Err(e) if e.is_stale() => {
                warn!("Stale element at card {}, skipping", index + 1);
            }
            Err(e) => {
                warn!("Error processing card {}: {}", index + 1, e);
            }
        }
    }
    jobs
}

fn read_card(card: &dyn Element, layout: &CardLayout, base: Option<&Url>) -> Result<JobSummary> {
    Ok(JobSummary {
        title: read_field(card, layout.title, base)?,
        company: read_field(card, layout.company, base)?,
        location: read_field(card, layout.location, base)?,
        link: read_field(card, layout.link, base)?,
        detail_text: None,
    })
}

/// Only staleness propagates; any other failure leaves the field unset.
fn read_field(card: &dyn Element, rule: Option<FieldRule>, base: Option<&Url>) -> Result<Option<String>> {
    let Some(rule) = rule else {
        return Ok(None);
    };

    let element = match card.find(rule.css) {
        Ok(Some(element)) => element,
        Ok(None) => {
            debug!("No match for {} in card", rule.css);
            return Ok(None);
        }
        Err(e) if e.is_stale() => return Err(e),
        Err(e) => {
            debug!("Lookup of {} failed: {}", rule.css, e);
            return Ok(None);
        }
    };

    let value = match rule.source {
        FieldSource::Text => element.text().map(Some),
        FieldSource::Line(n) => element.text().map(|text| nth_line(&text, n)),
        FieldSource::Attribute(name) => element.attribute(name),
        FieldSource::Link => element
            .attribute("href")
            .map(|href| href.map(|h| resolve_link(base, &h))),
    };

    match value {
        Ok(v) => Ok(v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())),
        Err(e) if e.is_stale() => Err(e),
        Err(e) => {
            debug!("Reading {} failed: {}", rule.css, e);
            Ok(None)
        }
    }
}

fn nth_line(text: &str, n: usize) -> Option<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .nth(n)
        .map(str::to_string)
}

fn resolve_link(base: Option<&Url>, href: &str) -> String {
    match base.and_then(|b| b.join(href).ok()) {
        Some(url) => url.to_string(),
        None => href.to_string(),
    }
}
