use log::{debug, info, warn};

use crate::browser::{click_when_present, Page};
use crate::config::Config;
use crate::detail::DetailLayout;
use crate::extractor::{CardLayout, FieldRule};
use crate::models::{JobType, SearchCriteria};

use super::SiteAdapter;

const SEARCH_URL: &str = "https://www.hellowork.com/fr-fr/emploi/recherche.html";
const HOME_URL: &str = "https://www.hellowork.com";

const CONSENT_BUTTON: &str = "#hw-cc-notice-accept-btn";
const RESULTS_CONSENT_BUTTON: &str = "#didomi-notice-agree-button";

static CARDS: CardLayout = CardLayout {
    card: r#"[data-cy="serpCard"]"#,
    // Title and company share the card heading, one per line.
    title: Some(FieldRule::line("h3", 0)),
    company: Some(FieldRule::line("h3", 1)),
    location: Some(FieldRule::text(r#"[data-cy="localisationCard"]"#)),
    link: Some(FieldRule::link("a")),
};

static DETAIL: DetailLayout = DetailLayout {
    container: "body > main > div:nth-of-type(4) > div:nth-of-type(3) > div:nth-of-type(1) \
                > div:nth-of-type(2) > div > div:nth-of-type(2)",
    excluded: "div button",
    section: "section",
    heading: "h2",
    lead_paragraph: "p",
    fallback: None,
    expand: &[],
};

/// hellowork.com: anonymous browsing, a consent banner and nothing else.
pub struct HelloWork;

fn contract_filter(job_type: JobType) -> Option<&'static str> {
    match job_type {
        JobType::All => None,
        JobType::Internship => Some("Stage"),
        JobType::FullTime => Some("CDI"),
        JobType::PartTime => Some("CDD"),
    }
}

/// Form-style encoding: spaces become '+'.
fn form_encode(value: &str) -> String {
    urlencoding::encode(value.trim()).replace("%20", "+")
}

impl SiteAdapter for HelloWork {
    fn name(&self) -> &'static str {
        "HelloWork"
    }

    fn domain_key(&self) -> &'static str {
        "hellowork.com"
    }

    fn home_url(&self) -> &'static str {
        HOME_URL
    }

    fn search_url(&self, criteria: &SearchCriteria) -> String {
        let mut url = format!(
            "{}?k={}&l={}",
            SEARCH_URL,
            form_encode(&criteria.keywords),
            form_encode(&criteria.location)
        );
        if let Some(contract) = contract_filter(criteria.job_type) {
            url.push_str("&c=");
            url.push_str(contract);
        }
        if criteria.page > 1 {
            url.push_str(&format!("&p={}", criteria.page));
        }
        url
    }

    fn page_param(&self) -> &'static str {
        "p"
    }

    fn card_layout(&self) -> &'static CardLayout {
        &CARDS
    }

    fn detail_layout(&self) -> &'static DetailLayout {
        &DETAIL
    }

    fn establish_session(&self, page: &dyn Page, config: &Config) -> bool {
        match click_when_present(page, CONSENT_BUTTON, config.presence_timeout) {
            Ok(true) => {
                info!("Accepted HelloWork cookie banner");
                true
            }
            Ok(false) => {
                debug!("No cookie prompt found or already handled");
                false
            }
            Err(e) => {
                warn!("Could not accept cookie banner: {}", e);
                false
            }
        }
    }

    fn dismiss_page_artifacts(&self, page: &dyn Page, config: &Config) -> bool {
        match click_when_present(page, RESULTS_CONSENT_BUTTON, config.presence_timeout) {
            Ok(clicked) => {
                if clicked {
                    info!("Accepted consent prompt on results page");
                }
                clicked
            }
            Err(e) => {
                debug!("Consent prompt not clickable: {}", e);
                false
            }
        }
    }
}
