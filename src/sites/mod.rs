//! Per-site knowledge: URLs, selectors and the session-establishment ritual.
//! Everything else (pagination, card reading, detail extraction) is shared.

pub mod hellowork;
pub mod wttj;

use std::fmt;
use std::str::FromStr;

use crate::browser::Page;
use crate::config::Config;
use crate::detail::DetailLayout;
use crate::error::ScrapeError;
use crate::extractor::CardLayout;
use crate::models::SearchCriteria;

pub use hellowork::HelloWork;
pub use wttj::WelcomeToTheJungle;

pub trait SiteAdapter {
    fn name(&self) -> &'static str;
    /// Key under which this site's cookies are persisted.
    fn domain_key(&self) -> &'static str;
    /// Landing page opened before cookies are restored.
    fn home_url(&self) -> &'static str;
    fn search_url(&self, criteria: &SearchCriteria) -> String;
    /// Query parameter that carries the result page number.
    fn page_param(&self) -> &'static str;
    fn card_layout(&self) -> &'static CardLayout;
    fn detail_layout(&self) -> &'static DetailLayout;

    /// Consent and login on a fresh session. Returns `true` when the session
    /// state is worth persisting.
    fn establish_session(&self, page: &dyn Page, config: &Config) -> bool;

    /// Overlays that only show up on result pages. Returns `true` when
    /// something was dismissed.
    fn dismiss_page_artifacts(&self, _page: &dyn Page, _config: &Config) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    HelloWork,
    WelcomeToTheJungle,
}

impl Site {
    pub const ALL: [Site; 2] = [Site::HelloWork, Site::WelcomeToTheJungle];

    pub fn adapter(self) -> Box<dyn SiteAdapter> {
        match self {
            Site::HelloWork => Box::new(HelloWork),
            Site::WelcomeToTheJungle => Box::new(WelcomeToTheJungle),
        }
    }
}

impl FromStr for Site {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        match normalized.as_str() {
            "hellowork" | "hw" => Ok(Site::HelloWork),
            "wttj" | "welcometothejungle" => Ok(Site::WelcomeToTheJungle),
            _ => Err(ScrapeError::Config(format!("unknown site '{}'", s))),
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Site::HelloWork => "HelloWork",
            Site::WelcomeToTheJungle => "Welcome to the Jungle",
        })
    }
}
