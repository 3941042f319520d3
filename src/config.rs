use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, ScrapeError};

/// Which page backend a session is driven through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Chrome,
    Http,
}

impl FromStr for Backend {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "chrome" | "browser" => Ok(Backend::Chrome),
            "http" | "static" => Ok(Backend::Http),
            other => Err(ScrapeError::Config(format!("unknown backend '{}'", other))),
        }
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"********")
            .finish()
    }
}

/// Read-only settings handed to the engine by whoever hosts it.
#[derive(Debug, Clone)]
pub struct Config {
    pub headless: bool,
    pub backend: Backend,
    /// Settle time after every navigation.
    pub page_wait: Duration,
    /// First-load wait for primary content (result cards, detail container).
    pub element_timeout: Duration,
    /// Short wait used to decide whether a further page has any results.
    pub presence_timeout: Duration,
    /// Wait for consent banners and login controls.
    pub ritual_timeout: Duration,
    /// Pause around clicks on expandable sections.
    pub interaction_wait: Duration,
    pub max_pages: u32,
    pub max_expand_sweeps: u32,
    pub cookies_dir: PathBuf,
    pub credentials: Option<Credentials>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            headless: false,
            backend: Backend::Chrome,
            page_wait: Duration::from_secs(2),
            element_timeout: Duration::from_secs(10),
            presence_timeout: Duration::from_secs(5),
            ritual_timeout: Duration::from_secs(10),
            interaction_wait: Duration::from_secs(1),
            max_pages: 3,
            max_expand_sweeps: 3,
            cookies_dir: PathBuf::from("cookies"),
            credentials: None,
        }
    }
}

impl Config {
    /// Defaults overridden by the process environment (and `.env` if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(v) = lookup("JOB_SCRAPER_HEADLESS") {
            config.headless = parse_bool("JOB_SCRAPER_HEADLESS", &v)?;
        }
        if let Some(v) = lookup("JOB_SCRAPER_BACKEND") {
            config.backend = v.parse()?;
        }
        if let Some(v) = lookup("JOB_SCRAPER_PAGE_WAIT_SECS") {
            config.page_wait = Duration::from_secs(parse_num("JOB_SCRAPER_PAGE_WAIT_SECS", &v)?);
        }
        if let Some(v) = lookup("JOB_SCRAPER_ELEMENT_TIMEOUT_SECS") {
            config.element_timeout =
                Duration::from_secs(parse_num("JOB_SCRAPER_ELEMENT_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = lookup("JOB_SCRAPER_PRESENCE_TIMEOUT_SECS") {
            config.presence_timeout =
                Duration::from_secs(parse_num("JOB_SCRAPER_PRESENCE_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = lookup("JOB_SCRAPER_MAX_PAGES") {
            config.max_pages = parse_num("JOB_SCRAPER_MAX_PAGES", &v)?;
        }
        if let Some(v) = lookup("JOB_SCRAPER_COOKIES_DIR") {
            config.cookies_dir = PathBuf::from(v);
        }

        config.credentials = match (lookup("WTTJ_LOGIN_EMAIL"), lookup("WTTJ_LOGIN_PASSWORD")) {
            (Some(email), Some(password)) if !email.trim().is_empty() => Some(Credentials {
                email: email.trim().to_string(),
                password,
            }),
            _ => None,
        };

        Ok(config)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ScrapeError::Config(format!("{} must be a boolean, got '{}'", key, value))),
    }
}

fn parse_num<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ScrapeError::Config(format!("{} must be a number, got '{}'", key, value)))
}
