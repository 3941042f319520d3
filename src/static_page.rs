//! Scripting-free page backend: each navigation fetches HTML from a
//! [`PageSource`] and parses it with `scraper`.
//!
//! Nothing on the page runs, so clicks and typing are unsupported and waits
//! resolve immediately against the parsed document. Good enough for sites that
//! render listings server-side, and for replaying saved pages offline.

use std::sync::OnceLock;
use std::time::Duration;

use log::debug;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::browser::{Element, Page};
use crate::cookie_store::CookieRecord;
use crate::error::{Result, ScrapeError};

/// A fetched document.
#[derive(Debug, Clone)]
pub struct Fetched {
    /// Final URL after redirects.
    pub url: String,
    pub html: String,
    pub set_cookies: Vec<CookieRecord>,
}

/// Where a [`StaticPage`] gets its HTML from.
pub trait PageSource {
    fn fetch(&self, url: &str, cookies: &[CookieRecord]) -> Result<Fetched>;
}

pub struct StaticPage<S: PageSource> {
    source: S,
    url: String,
    document: Html,
    jar: Vec<CookieRecord>,
}

impl<S: PageSource> StaticPage<S> {
    pub fn new(source: S) -> Self {
        StaticPage {
            source,
            url: "about:blank".to_string(),
            document: Html::new_document(),
            jar: Vec::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn store_cookie(&mut self, cookie: CookieRecord) {
        self.jar
            .retain(|c| !(c.name == cookie.name && c.domain == cookie.domain && c.path == cookie.path));
        self.jar.push(cookie);
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::InvalidSelector(format!("{}: {}", css, e)))
}

fn whitespace() -> &'static Regex {
    static WS: OnceLock<Regex> = OnceLock::new();
    WS.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Approximates rendered text: one line per non-blank text node, inner
/// whitespace collapsed.
fn rendered_text(node: ElementRef<'_>) -> String {
    node.text()
        .map(|chunk| whitespace().replace_all(chunk, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

impl<S: PageSource> Page for StaticPage<S> {
    fn navigate(&mut self, url: &str) -> Result<()> {
        let host = Url::parse(url)?.host_str().unwrap_or_default().to_string();
        let outgoing: Vec<CookieRecord> = self
            .jar
            .iter()
            .filter(|c| c.matches_host(&host))
            .cloned()
            .collect();

        let fetched = self.source.fetch(url, &outgoing)?;
        debug!("Fetched {} ({} bytes)", fetched.url, fetched.html.len());

        self.url = fetched.url;
        self.document = Html::parse_document(&fetched.html);
        for cookie in fetched.set_cookies {
            self.store_cookie(cookie);
        }
        Ok(())
    }

    fn current_url(&self) -> String {
        self.url.clone()
    }

    fn refresh(&mut self) -> Result<()> {
        let url = self.url.clone();
        self.navigate(&url)
    }

    fn wait_for(&self, css: &str, _timeout: Duration) -> bool {
        match parse_selector(css) {
            Ok(selector) => self.document.select(&selector).next().is_some(),
            Err(_) => false,
        }
    }

    fn find(&self, css: &str) -> Result<Option<Box<dyn Element + '_>>> {
        let selector = parse_selector(css)?;
        Ok(self
            .document
            .select(&selector)
            .next()
            .map(|node| Box::new(StaticElement { node }) as Box<dyn Element + '_>))
    }

    fn find_all(&self, css: &str) -> Result<Vec<Box<dyn Element + '_>>> {
        let selector = parse_selector(css)?;
        Ok(self
            .document
            .select(&selector)
            .map(|node| Box::new(StaticElement { node }) as Box<dyn Element + '_>)
            .collect())
    }

    fn cookies(&self) -> Result<Vec<CookieRecord>> {
        Ok(self.jar.clone())
    }

    fn add_cookie(&mut self, cookie: &CookieRecord) -> Result<()> {
        self.store_cookie(cookie.clone());
        Ok(())
    }

    fn close(&mut self) {
        self.document = Html::new_document();
    }
}

struct StaticElement<'a> {
    node: ElementRef<'a>,
}

impl Element for StaticElement<'_> {
    fn id(&self) -> String {
        format!("{:?}", self.node.id())
    }

    fn text(&self) -> Result<String> {
        Ok(rendered_text(self.node))
    }

    fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.node.value().attr(name).map(str::to_string))
    }

    fn find(&self, css: &str) -> Result<Option<Box<dyn Element + '_>>> {
        let selector = parse_selector(css)?;
        Ok(self
            .node
            .select(&selector)
            .next()
            .map(|node| Box::new(StaticElement { node }) as Box<dyn Element + '_>))
    }

    fn find_all(&self, css: &str) -> Result<Vec<Box<dyn Element + '_>>> {
        let selector = parse_selector(css)?;
        Ok(self
            .node
            .select(&selector)
            .map(|node| Box::new(StaticElement { node }) as Box<dyn Element + '_>)
            .collect())
    }

    fn click(&self) -> Result<()> {
        Err(ScrapeError::Unsupported("click"))
    }

    fn type_text(&self, _text: &str) -> Result<()> {
        Err(ScrapeError::Unsupported("type_text"))
    }

    fn is_displayed(&self) -> Result<bool> {
        let element = self.node.value();
        let style = element.attr("style").unwrap_or_default().replace(' ', "");
        Ok(element.attr("hidden").is_none() && !style.contains("display:none"))
    }

    fn scroll_into_view(&self) -> Result<()> {
        Ok(())
    }
}
