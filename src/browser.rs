//! Backend-agnostic view of a live page.
//!
//! Site adapters and extractors only ever talk to [`Page`] and [`Element`], so
//! the same selectors run against a DevTools-driven Chromium tab
//! ([`crate::chrome`]) or a parsed HTML snapshot ([`crate::static_page`]).

use std::time::Duration;

use crate::config::Config;
use crate::cookie_store::CookieRecord;
use crate::error::{Result, ScrapeError};

/// A CSS selector with an optional visible-text filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locator {
    pub css: &'static str,
    pub containing: Option<&'static str>,
}

impl Locator {
    pub const fn css(css: &'static str) -> Self {
        Locator { css, containing: None }
    }

    pub const fn css_containing(css: &'static str, text: &'static str) -> Self {
        Locator {
            css,
            containing: Some(text),
        }
    }

    fn accepts(&self, element: &dyn Element) -> Result<bool> {
        match self.containing {
            None => Ok(true),
            Some(needle) => Ok(element.text()?.contains(needle)),
        }
    }
}

pub trait Element {
    /// Identity stable for as long as the node lives; used for visited-sets.
    fn id(&self) -> String;
    fn text(&self) -> Result<String>;
    fn attribute(&self, name: &str) -> Result<Option<String>>;
    fn find(&self, css: &str) -> Result<Option<Box<dyn Element + '_>>>;
    fn find_all(&self, css: &str) -> Result<Vec<Box<dyn Element + '_>>>;
    fn click(&self) -> Result<()>;
    fn type_text(&self, text: &str) -> Result<()>;
    fn is_displayed(&self) -> Result<bool>;
    fn scroll_into_view(&self) -> Result<()>;
}

pub trait Page {
    fn navigate(&mut self, url: &str) -> Result<()>;
    fn current_url(&self) -> String;
    fn refresh(&mut self) -> Result<()>;
    /// `true` once something matches `css`; `false` on timeout or a dead session.
    fn wait_for(&self, css: &str, timeout: Duration) -> bool;
    fn find(&self, css: &str) -> Result<Option<Box<dyn Element + '_>>>;
    fn find_all(&self, css: &str) -> Result<Vec<Box<dyn Element + '_>>>;
    fn cookies(&self) -> Result<Vec<CookieRecord>>;
    fn add_cookie(&mut self, cookie: &CookieRecord) -> Result<()>;
    fn close(&mut self);
}

/// Starts a fresh page on some backend.
pub trait Launcher {
    fn launch(&self, config: &Config) -> Result<Box<dyn Page>>;
}

/// All elements matching `locator`, text filter applied. Elements whose text
/// cannot be read while filtering are skipped.
pub fn locate_all<'a>(page: &'a dyn Page, locator: &Locator) -> Result<Vec<Box<dyn Element + 'a>>> {
    let candidates = page.find_all(locator.css)?;
    if locator.containing.is_none() {
        return Ok(candidates);
    }
    Ok(candidates
        .into_iter()
        .filter(|el| locator.accepts(el.as_ref()).unwrap_or(false))
        .collect())
}

/// Waits for `css` then clicks the first match. Returns whether a click happened.
pub fn click_when_present(page: &dyn Page, css: &str, timeout: Duration) -> Result<bool> {
    if !page.wait_for(css, timeout) {
        return Ok(false);
    }
    match page.find(css)? {
        Some(el) => {
            el.click()?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Waits for an input matching `css` and types `text` into it.
pub fn fill_when_present(page: &dyn Page, css: &str, text: &str, timeout: Duration) -> Result<()> {
    if !page.wait_for(css, timeout) {
        return Err(ScrapeError::Timeout {
            selector: css.to_string(),
        });
    }
    match page.find(css)? {
        Some(el) => el.type_text(text),
        None => Err(ScrapeError::ElementNotFound {
            selector: css.to_string(),
        }),
    }
}
