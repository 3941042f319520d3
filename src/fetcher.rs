use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, COOKIE, SET_COOKIE, USER_AGENT};
use std::time::Duration;
use log::{info, warn};

use crate::browser::{Launcher, Page};
use crate::config::Config;
use crate::cookie_store::{CookieRecord, SameSite};
use crate::error::{Result, ScrapeError};
use crate::static_page::{Fetched, PageSource, StaticPage};

const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
];

/// Plain HTTP document source for [`StaticPage`].
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("fr-FR,fr;q=0.9,en-US;q=0.8"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(HttpSource { client })
    }

    fn random_user_agent(&self) -> &'static str {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())]
    }
}

impl PageSource for HttpSource {
    fn fetch(&self, url: &str, cookies: &[CookieRecord]) -> Result<Fetched> {
        let mut request = self.client.get(url).header(USER_AGENT, self.random_user_agent());
        if !cookies.is_empty() {
            let header = cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.header(COOKIE, header);
        }

        let resp = request.send()?;
        let status = resp.status();
        if status.as_u16() == 403 || status.as_u16() == 429 {
            warn!("Blocked at {}: {}", url, status);
            return Err(ScrapeError::navigation(url, format!("blocked ({})", status)));
        }
        if !status.is_success() {
            return Err(ScrapeError::navigation(url, status));
        }

        let final_url = resp.url().clone();
        let host = final_url.host_str().unwrap_or_default().to_string();
        let set_cookies = resp
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| parse_set_cookie(value, &host))
            .collect();

        let html = resp.text()?;
        Ok(Fetched {
            url: final_url.to_string(),
            html,
            set_cookies,
        })
    }
}

fn parse_set_cookie(header: &str, default_domain: &str) -> Option<CookieRecord> {
    let parsed = cookie::Cookie::parse(header.to_string()).ok()?;

    let expiry = parsed
        .max_age()
        .map(|age| chrono::Utc::now().timestamp() + age.whole_seconds())
        .or_else(|| parsed.expires_datetime().map(|at| at.unix_timestamp()));

    Some(CookieRecord {
        name: parsed.name().to_string(),
        value: parsed.value().to_string(),
        domain: parsed.domain().unwrap_or(default_domain).to_string(),
        path: parsed.path().unwrap_or("/").to_string(),
        same_site: match parsed.same_site() {
            Some(cookie::SameSite::Strict) => SameSite::Strict,
            Some(cookie::SameSite::None) => SameSite::None,
            _ => SameSite::Lax,
        },
        expiry,
        secure: parsed.secure().unwrap_or(false),
        http_only: parsed.http_only().unwrap_or(false),
    })
}

/// Launches scripting-free pages backed by [`HttpSource`].
pub struct HttpLauncher;

impl Launcher for HttpLauncher {
    fn launch(&self, config: &Config) -> Result<Box<dyn Page>> {
        let source = HttpSource::new(config.element_timeout.max(Duration::from_secs(30)))
            .map_err(|e| ScrapeError::Launch(e.to_string()))?;
        info!("Started HTTP page backend (no script execution)");
        Ok(Box::new(StaticPage::new(source)))
    }
}
