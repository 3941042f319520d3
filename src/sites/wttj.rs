use log::{debug, info, warn};

use crate::browser::{click_when_present, fill_when_present, Locator, Page};
use crate::config::{Config, Credentials};
use crate::detail::DetailLayout;
use crate::error::{Result, ScrapeError};
use crate::extractor::{CardLayout, FieldRule};
use crate::models::{JobType, SearchCriteria};

use super::SiteAdapter;

const SEARCH_URL: &str = "https://www.welcometothejungle.com/fr/jobs";
const HOME_URL: &str = "https://www.welcometothejungle.com";
const SEARCH_RADIUS_KM: u32 = 20;
const COUNTRY_FILTER: &str = "refinementList%5Boffices.country_code%5D%5B%5D=FR";
const CONTRACT_FILTER: &str = "refinementList%5Bcontract_type%5D%5B%5D";

const CONSENT_BUTTON: &str = r#"[aria-label="Accepter les cookies"]"#;
const LOGIN_BUTTON: &str = r#"[data-testid="not-logged-visible-login-button"]"#;
const LOGIN_TAB: &str = r#"[data-testid="session-tab-login"]"#;
const EMAIL_FIELD: &str = r#"[data-testid="login-field-email"]"#;
const PASSWORD_FIELD: &str = r#"[data-testid="login-field-password"]"#;
const SUBMIT_BUTTON: &str = r#"[data-testid="login-button-submit"]"#;
const PROFILE_MODAL_CLOSE: &str = r#"[data-testid="finalize-profile-close-modal"]"#;

static CARDS: CardLayout = CardLayout {
    card: r#"[data-role="jobs:thumb"]"#,
    title: Some(FieldRule::text(r#"h4.wui-text div[role="mark"]"#)),
    company: Some(FieldRule::text("span.wui-text")),
    location: Some(FieldRule::text("p.wui-text span span")),
    link: Some(FieldRule::link(r#"a[href*="/jobs/"]"#)),
};

static DETAIL: DetailLayout = DetailLayout {
    container: "#the-position-section",
    excluded: "#the-position-section button",
    section: r#"[data-testid="job-section-description"]"#,
    heading: "h2",
    lead_paragraph: "p",
    fallback: Some(r#"[class*="ExpandableHtml_container"]"#),
    expand: &[
        Locator::css(r#"[data-testid="view-more-btn"]"#),
        Locator::css_containing("a", "Voir plus"),
    ],
};

/// welcometothejungle.com: consent banner plus an account login, and job
/// descriptions folded behind "Voir plus" controls.
pub struct WelcomeToTheJungle;

fn contract_filter(job_type: JobType) -> Option<&'static str> {
    match job_type {
        JobType::All => None,
        JobType::Internship => Some("internship"),
        JobType::FullTime => Some("permanent"),
        JobType::PartTime => Some("temporary"),
    }
}

/// Only the first comma-separated segment ("Paris, France" -> "Paris").
fn city_of(location: &str) -> &str {
    location.split(',').next().unwrap_or_default().trim()
}

fn log_in(page: &dyn Page, credentials: &Credentials, config: &Config) -> Result<()> {
    let timeout = config.ritual_timeout;
    let require = |css: &str| -> Result<()> {
        if click_when_present(page, css, timeout)? {
            Ok(())
        } else {
            Err(ScrapeError::Timeout {
                selector: css.to_string(),
            })
        }
    };

    require(LOGIN_BUTTON)?;
    require(LOGIN_TAB)?;
    fill_when_present(page, EMAIL_FIELD, &credentials.email, timeout)?;
    fill_when_present(page, PASSWORD_FIELD, &credentials.password, timeout)?;
    require(SUBMIT_BUTTON)?;

    match click_when_present(page, PROFILE_MODAL_CLOSE, timeout) {
        Ok(true) => debug!("Closed profile completion modal"),
        _ => debug!("No finalize profile modal found"),
    }
    Ok(())
}

impl SiteAdapter for WelcomeToTheJungle {
    fn name(&self) -> &'static str {
        "Welcome to the Jungle"
    }

    fn domain_key(&self) -> &'static str {
        "welcometothejungle.com"
    }

    fn home_url(&self) -> &'static str {
        HOME_URL
    }

    fn search_url(&self, criteria: &SearchCriteria) -> String {
        let mut url = format!(
            "{}?query={}&aroundQuery={}&aroundRadius={}&page={}&{}",
            SEARCH_URL,
            urlencoding::encode(criteria.keywords.trim()),
            urlencoding::encode(city_of(&criteria.location)),
            SEARCH_RADIUS_KM,
            criteria.page,
            COUNTRY_FILTER
        );
        if let Some(contract) = contract_filter(criteria.job_type) {
            url.push_str(&format!("&{}={}", CONTRACT_FILTER, contract));
        }
        url
    }

    fn page_param(&self) -> &'static str {
        "page"
    }

    fn card_layout(&self) -> &'static CardLayout {
        &CARDS
    }

    fn detail_layout(&self) -> &'static DetailLayout {
        &DETAIL
    }

    fn establish_session(&self, page: &dyn Page, config: &Config) -> bool {
        let consented = match click_when_present(page, CONSENT_BUTTON, config.ritual_timeout) {
            Ok(clicked) => {
                if clicked {
                    info!("Accepted cookies");
                }
                clicked
            }
            Err(e) => {
                warn!("Accept cookies button not clickable: {}", e);
                false
            }
        };

        // Only an anonymous session shows the login entry point.
        if !page.wait_for(LOGIN_BUTTON, config.presence_timeout) {
            return consented;
        }
        let Some(credentials) = config.credentials.as_ref() else {
            warn!("No Welcome to the Jungle credentials configured, continuing anonymously");
            return consented;
        };

        match log_in(page, credentials, config) {
            Ok(()) => {
                info!("Successfully logged in to Welcome to the Jungle");
                true
            }
            Err(e) => {
                warn!("Login failed: {}", e);
                consented
            }
        }
    }
}
