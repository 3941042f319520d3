//! Live page backend over a Chromium DevTools session.

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::protocol::cdp::Network;
use headless_chrome::{Browser, LaunchOptions, Tab};
use log::{debug, info, warn};

use crate::browser::{Element, Launcher, Page};
use crate::config::Config;
use crate::cookie_store::{CookieRecord, SameSite};
use crate::error::{Result, ScrapeError};

const IS_DISPLAYED_JS: &str = "function() { \
    const style = window.getComputedStyle(this); \
    return style.visibility !== 'hidden' && style.display !== 'none' \
        && !!(this.offsetWidth || this.offsetHeight || this.getClientRects().length); }";

const SCROLL_INTO_VIEW_JS: &str = "function() { this.scrollIntoView({block: 'center'}); }";

pub struct ChromeLauncher;

impl Launcher for ChromeLauncher {
    fn launch(&self, config: &Config) -> Result<Box<dyn Page>> {
        let args = vec![
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-blink-features=AutomationControlled"),
        ];
        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false)
            .window_size(Some((1366, 900)))
            .idle_browser_timeout(Duration::from_secs(300))
            .args(args)
            .build()
            .map_err(|e| ScrapeError::Launch(e.to_string()))?;

        let browser = Browser::new(options).map_err(|e| ScrapeError::Launch(e.to_string()))?;
        let tab = browser.new_tab().map_err(|e| ScrapeError::Launch(e.to_string()))?;
        tab.set_default_timeout(config.element_timeout);

        info!("Launched Chromium (headless: {})", config.headless);
        Ok(Box::new(ChromePage { tab, _browser: browser }))
    }
}

pub struct ChromePage {
    tab: Arc<Tab>,
    // Dropping the browser kills the process, so it lives as long as the page.
    _browser: Browser,
}

/// Node lookups that matched nothing are reported as errors by the driver.
fn is_not_found(err: &anyhow::Error) -> bool {
    let msg = err.to_string().to_lowercase();
    msg.contains("no element found") || msg.contains("couldn't find element")
}

fn classify(err: anyhow::Error) -> ScrapeError {
    let msg = err.to_string().to_lowercase();
    if msg.contains("could not find node")
        || msg.contains("no node with given id")
        || msg.contains("node is detached")
        || msg.contains("cannot find context with specified id")
    {
        ScrapeError::StaleElement
    } else {
        ScrapeError::Browser(err)
    }
}

fn found<T>(result: anyhow::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if is_not_found(&e) => Ok(None),
        Err(e) => Err(classify(e)),
    }
}

fn found_all<T>(result: anyhow::Result<Vec<T>>) -> Result<Vec<T>> {
    Ok(found(result)?.unwrap_or_default())
}

fn to_record(cookie: Network::Cookie) -> CookieRecord {
    CookieRecord {
        name: cookie.name,
        value: cookie.value,
        domain: cookie.domain,
        path: cookie.path,
        same_site: match cookie.same_site {
            Some(Network::CookieSameSite::Strict) => SameSite::Strict,
            Some(Network::CookieSameSite::None) => SameSite::None,
            _ => SameSite::Lax,
        },
        expiry: if cookie.session || cookie.expires <= 0.0 {
            None
        } else {
            Some(cookie.expires as i64)
        },
        secure: cookie.secure,
        http_only: cookie.http_only,
    }
}

impl Page for ChromePage {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| ScrapeError::navigation(url, e))?;
        Ok(())
    }

    fn current_url(&self) -> String {
        self.tab.get_url()
    }

    fn refresh(&mut self) -> Result<()> {
        let url = self.tab.get_url();
        self.tab
            .reload(false, None)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| ScrapeError::navigation(&url, e))?;
        Ok(())
    }

    fn wait_for(&self, css: &str, timeout: Duration) -> bool {
        match self.tab.wait_for_element_with_custom_timeout(css, timeout) {
            Ok(_) => true,
            Err(e) => {
                debug!("Gave up waiting for {}: {}", css, e);
                false
            }
        }
    }

    fn find(&self, css: &str) -> Result<Option<Box<dyn Element + '_>>> {
        Ok(found(self.tab.find_element(css))?
            .map(|el| Box::new(ChromeElement { el }) as Box<dyn Element + '_>))
    }

    fn find_all(&self, css: &str) -> Result<Vec<Box<dyn Element + '_>>> {
        Ok(found_all(self.tab.find_elements(css))?
            .into_iter()
            .map(|el| Box::new(ChromeElement { el }) as Box<dyn Element + '_>)
            .collect())
    }

    fn cookies(&self) -> Result<Vec<CookieRecord>> {
        let cookies = self.tab.get_cookies().map_err(ScrapeError::Browser)?;
        Ok(cookies.into_iter().map(to_record).collect())
    }

    fn add_cookie(&mut self, cookie: &CookieRecord) -> Result<()> {
        let same_site = match cookie.same_site {
            SameSite::Strict => Network::CookieSameSite::Strict,
            SameSite::Lax => Network::CookieSameSite::Lax,
            SameSite::None => Network::CookieSameSite::None,
        };
        self.tab
            .call_method(Network::SetCookie {
                name: cookie.name.clone(),
                value: cookie.value.clone(),
                domain: Some(cookie.domain.clone()).filter(|d| !d.is_empty()),
                url: Some(self.tab.get_url()).filter(|_| cookie.domain.is_empty()),
                path: Some(cookie.path.clone()),
                secure: Some(cookie.secure),
                http_only: Some(cookie.http_only),
                same_site: Some(same_site),
                expires: cookie.expiry.map(|secs| secs as f64),
                priority: None,
                same_party: None,
                source_scheme: None,
                source_port: None,
                partition_key: None,
            })
            .map_err(ScrapeError::Browser)?;
        Ok(())
    }

    fn close(&mut self) {
        if let Err(e) = self.tab.close(true) {
            warn!("Failed to close tab cleanly: {}", e);
        }
    }
}

struct ChromeElement<'a> {
    el: headless_chrome::Element<'a>,
}

impl Element for ChromeElement<'_> {
    fn id(&self) -> String {
        self.el.backend_node_id.to_string()
    }

    fn text(&self) -> Result<String> {
        self.el.get_inner_text().map_err(classify)
    }

    fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.el.get_attribute_value(name).map_err(classify)
    }

    fn find(&self, css: &str) -> Result<Option<Box<dyn Element + '_>>> {
        Ok(found(self.el.find_element(css))?
            .map(|el| Box::new(ChromeElement { el }) as Box<dyn Element + '_>))
    }

    fn find_all(&self, css: &str) -> Result<Vec<Box<dyn Element + '_>>> {
        Ok(found_all(self.el.find_elements(css))?
            .into_iter()
            .map(|el| Box::new(ChromeElement { el }) as Box<dyn Element + '_>)
            .collect())
    }

    fn click(&self) -> Result<()> {
        self.el.click().map(|_| ()).map_err(classify)
    }

    fn type_text(&self, text: &str) -> Result<()> {
        self.el.type_into(text).map(|_| ()).map_err(classify)
    }

    fn is_displayed(&self) -> Result<bool> {
        let result = self
            .el
            .call_js_fn(IS_DISPLAYED_JS, vec![], false)
            .map_err(classify)?;
        Ok(result.value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    fn scroll_into_view(&self) -> Result<()> {
        self.el
            .call_js_fn(SCROLL_INTO_VIEW_JS, vec![], false)
            .map(|_| ())
            .map_err(classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(classify(anyhow::anyhow!("Could not find node with given id")).is_stale());
        assert!(classify(anyhow::anyhow!("Node is detached from document")).is_stale());
        assert!(matches!(
            classify(anyhow::anyhow!("Method not found")),
            ScrapeError::Browser(_)
        ));
    }

    #[test]
    fn test_not_found_maps_to_empty() {
        let none: Result<Option<u8>> = found(Err(anyhow::anyhow!("No element found")));
        assert!(none.unwrap().is_none());
        let all: Result<Vec<u8>> = found_all(Err(anyhow::anyhow!("No element found")));
        assert!(all.unwrap().is_empty());
        let err: Result<Option<u8>> = found(Err(anyhow::anyhow!("connection closed")));
        assert!(err.is_err());
    }
}
