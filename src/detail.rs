//! Job page text: expanding collapsed sections, then reading the main
//! content container.

use std::collections::HashSet;
use std::time::Duration;

use log::{debug, info, warn};

use crate::browser::{locate_all, Element, Locator, Page};
use crate::delay_manager;
use crate::error::{Result, ScrapeError};
use crate::models::{is_punctuation_only, JobDetail};

/// Where the description lives on a job page.
#[derive(Debug, Clone, Copy)]
pub struct DetailLayout {
    pub container: &'static str,
    /// Interactive elements whose labels are stripped from the cleaned text.
    pub excluded: &'static str,
    /// Expected section inside the container.
    pub section: &'static str,
    /// Heading inside `section`.
    pub heading: &'static str,
    /// First paragraph inside `section`.
    pub lead_paragraph: &'static str,
    /// Read instead of the container when the container has no text.
    pub fallback: Option<&'static str>,
    /// "Show more" controls, most specific first.
    pub expand: &'static [Locator],
}

/// Clicks every visible expand control until none new appear.
///
/// Controls are tracked by identity, so a control that stays in the DOM after
/// being clicked is never clicked twice. Each sweep re-queries the page since
/// expanding can reveal further controls. Returns the number of clicks.
pub fn expand_all(page: &dyn Page, controls: &[Locator], max_sweeps: u32, pause: Duration) -> usize {
    let mut clicked: HashSet<String> = HashSet::new();

    for sweep in 1..=max_sweeps {
        let candidates = first_matching(page, controls);
        if candidates.is_empty() {
            debug!("No expand controls on sweep {}", sweep);
            break;
        }

        let mut progressed = false;
        for control in candidates {
            let id = control.id();
            if clicked.contains(&id) {
                continue;
            }
            match control.is_displayed() {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    debug!("Skipping expand control {}: {}", id, e);
                    continue;
                }
            }
            match click_control(control.as_ref(), pause) {
                Ok(()) => {
                    clicked.insert(id);
                    progressed = true;
                }
                Err(e) => warn!("Error clicking expand control: {}", e),
            }
        }

        if !progressed {
            break;
        }
    }

    if !clicked.is_empty() {
        info!("Expanded {} collapsed sections", clicked.len());
    }
    clicked.len()
}

fn first_matching<'a>(page: &'a dyn Page, controls: &[Locator]) -> Vec<Box<dyn Element + 'a>> {
    for locator in controls {
        match locate_all(page, locator) {
            Ok(found) if !found.is_empty() => return found,
            Ok(_) => {}
            Err(e) => debug!("Expand lookup {} failed: {}", locator.css, e),
        }
    }
    Vec::new()
}

fn click_control(control: &dyn Element, pause: Duration) -> Result<()> {
    control.scroll_into_view()?;
    delay_manager::page_delay(pause);
    control.click()?;
    delay_manager::page_delay(pause);
    Ok(())
}

/// Reads the job description. `None` when the container never shows up or
/// cannot be read.
pub fn extract_detail(page: &dyn Page, layout: &DetailLayout, timeout: Duration) -> Option<JobDetail> {
    if !page.wait_for(layout.container, timeout) {
        warn!("Timeout waiting for the job content container");
        return None;
    }
    match read_detail(page, layout) {
        Ok(detail) => Some(detail),
        Err(e) => {
            warn!("Error retrieving section text: {}", e);
            None
        }
    }
}

fn read_detail(page: &dyn Page, layout: &DetailLayout) -> Result<JobDetail> {
    let container = page
        .find(layout.container)?
        .ok_or_else(|| ScrapeError::ElementNotFound {
            selector: layout.container.to_string(),
        })?;

    let mut raw = container.text()?;
    if raw.trim().is_empty() {
        if let Some(fallback) = layout.fallback {
            debug!("Container empty, reading {}", fallback);
            raw = joined_text(page, fallback);
        }
    }

    let mut detail = JobDetail::new(raw, excluded_fragments(page, layout.excluded));

    if let Ok(Some(section)) = container.find(layout.section) {
        let heading = section
            .find(layout.heading)
            .ok()
            .flatten()
            .and_then(|h| h.text().ok());
        if let Some(heading) = heading {
            detail.structure_found = true;
            detail.heading_text = Some(heading.trim().to_string());
            detail.lead_paragraph_text = section
                .find(layout.lead_paragraph)
                .ok()
                .flatten()
                .and_then(|p| p.text().ok())
                .map(|t| t.trim().to_string());
        }
    }

    Ok(detail)
}

fn joined_text(page: &dyn Page, css: &str) -> String {
    page.find_all(css)
        .unwrap_or_default()
        .iter()
        .filter_map(|el| el.text().ok())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn excluded_fragments(page: &dyn Page, css: &str) -> Vec<String> {
    page.find_all(css)
        .unwrap_or_default()
        .iter()
        .filter_map(|el| el.text().ok())
        .map(|t| t.trim().to_string())
        .filter(|t| !is_punctuation_only(t))
        .collect()
}
