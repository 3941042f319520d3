//! Public entry points: search a site, fetch a job page.
//!
//! Nothing here fails outward. Every operation opens its own session, closes
//! it on every path and degrades to an empty result.

use log::{error, info, warn};

use crate::config::Config;
use crate::delay_manager;
use crate::detail::{expand_all, extract_detail};
use crate::error::Result;
use crate::models::{JobDetail, JobSummary, SearchCriteria};
use crate::pagination;
use crate::session::{Session, SessionManager};
use crate::sites::{Site, SiteAdapter};

/// Result of a search, telling "nothing found" apart from "could not start".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Jobs(Vec<JobSummary>),
    /// No browser session could be established; worth retrying later.
    NoSession,
}

impl SearchOutcome {
    pub fn into_jobs(self) -> Vec<JobSummary> {
        match self {
            SearchOutcome::Jobs(jobs) => jobs,
            SearchOutcome::NoSession => Vec::new(),
        }
    }
}

pub struct JobSource {
    adapter: Box<dyn SiteAdapter>,
    sessions: SessionManager,
}

impl JobSource {
    pub fn new(site: Site, config: Config) -> Self {
        Self::with_parts(site.adapter(), SessionManager::new(config))
    }

    pub fn with_parts(adapter: Box<dyn SiteAdapter>, sessions: SessionManager) -> Self {
        JobSource { adapter, sessions }
    }

    pub fn name(&self) -> &'static str {
        self.adapter.name()
    }

    fn config(&self) -> &Config {
        self.sessions.config()
    }

    pub fn search(&self, criteria: &SearchCriteria) -> Vec<JobSummary> {
        self.search_outcome(criteria).into_jobs()
    }

    pub fn search_outcome(&self, criteria: &SearchCriteria) -> SearchOutcome {
        let Some(mut session) = self.sessions.open(self.adapter.as_ref()) else {
            warn!("No browser session for {}, try again later", self.name());
            return SearchOutcome::NoSession;
        };

        match pagination::collect(&mut session, self.adapter.as_ref(), criteria, self.config()) {
            Ok(jobs) => {
                info!("Found {} jobs on {}", jobs.len(), self.name());
                SearchOutcome::Jobs(jobs)
            }
            Err(e) => {
                error!("Error searching jobs on {}: {}", self.name(), e);
                SearchOutcome::Jobs(Vec::new())
            }
        }
    }

    /// Structured text of a job page, or `None` if it could not be read.
    pub fn fetch_detail(&self, link: &str) -> Option<JobDetail> {
        let mut session = self.sessions.open(self.adapter.as_ref())?;
        match self.read_job_page(&mut session, link) {
            Ok(detail) => detail,
            Err(e) => {
                error!("Error getting job details from {}: {}", link, e);
                None
            }
        }
    }

    /// Cleaned description text of a job page.
    pub fn get_details(&self, link: &str) -> Option<String> {
        self.fetch_detail(link)
            .map(|detail| detail.cleaned_text.trim().to_string())
            .filter(|text| !text.is_empty())
    }

    /// Fills `detail_text` for every summary that has a link. Returns how many
    /// were filled.
    pub fn attach_details(&self, jobs: &mut [JobSummary]) -> usize {
        let mut filled = 0;
        for job in jobs.iter_mut() {
            let Some(link) = job.link.clone() else {
                continue;
            };
            job.detail_text = self.get_details(&link);
            if job.detail_text.is_some() {
                filled += 1;
            }
        }
        filled
    }

    fn read_job_page(&self, session: &mut Session, link: &str) -> Result<Option<JobDetail>> {
        let config = self.config();
        let layout = self.adapter.detail_layout();

        session.page_mut().navigate(link)?;
        delay_manager::page_delay(config.page_wait);

        if !layout.expand.is_empty() {
            expand_all(
                session.page(),
                layout.expand,
                config.max_expand_sweeps,
                config.interaction_wait,
            );
        }

        let detail = extract_detail(session.page(), layout, config.element_timeout);
        session.persist_cookies();
        Ok(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::time::Duration;

    use crate::browser::{Launcher, Page};
    use crate::error::ScrapeError;
    use crate::testing::{test_card, FakeElement, FakePage, TestSite, TEST_SEARCH};
    use tempfile::{tempdir, TempDir};

    const JOB: &str = "https://www.example.com/job/1";

    struct OneShot(RefCell<Option<FakePage>>);

    impl Launcher for OneShot {
        fn launch(&self, _config: &Config) -> Result<Box<dyn Page>> {
            self.0
                .borrow_mut()
                .take()
                .map(|page| Box::new(page) as Box<dyn Page>)
                .ok_or_else(|| ScrapeError::Launch("no browser".to_string()))
        }
    }

    fn source(page: Option<FakePage>) -> (JobSource, TempDir) {
        source_for(TestSite::new(false), page)
    }

    fn source_for(site: TestSite, page: Option<FakePage>) -> (JobSource, TempDir) {
        let dir = tempdir().unwrap();
        let config = Config {
            page_wait: Duration::ZERO,
            interaction_wait: Duration::ZERO,
            cookies_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let sessions = SessionManager::with_launcher(config, Box::new(OneShot(RefCell::new(page))));
        (JobSource::with_parts(Box::new(site), sessions), dir)
    }

    #[test]
    fn test_search_without_session_reports_it() {
        let (jobs, _dir) = source(None);
        let criteria = SearchCriteria::new("data", "Paris");
        assert_eq!(jobs.search_outcome(&criteria), SearchOutcome::NoSession);
    }

    #[test]
    fn test_search_returns_cards_and_closes_page() {
        let page = FakePage::at("about:blank").on(TEST_SEARCH, ".card", vec![test_card("1", "Data Scientist")]);
        let recorder = page.recorder();
        let (jobs, _dir) = source(Some(page));

        let found = jobs.search(&SearchCriteria::new("data", "Paris"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title.as_deref(), Some("Data Scientist"));
        assert!(recorder.closed.get());
    }

    #[test]
    fn test_failed_search_navigation_is_empty_and_closes_page() {
        let page = FakePage::at("about:blank").unreachable(TEST_SEARCH);
        let recorder = page.recorder();
        let (jobs, _dir) = source(Some(page));

        assert_eq!(
            jobs.search_outcome(&SearchCriteria::new("data", "Paris")),
            SearchOutcome::Jobs(Vec::new())
        );
        assert!(recorder.closed.get());
    }

    #[test]
    fn test_details_are_cleaned() {
        let page = FakePage::at("about:blank")
            .on(JOB, "#content", vec![FakeElement::new("c", "Missions\nPostuler")])
            .on(JOB, "button", vec![FakeElement::new("b", "Postuler")]);
        let (jobs, _dir) = source(Some(page));
        assert_eq!(jobs.get_details(JOB).as_deref(), Some("Missions"));
    }

    #[test]
    fn test_collapsed_description_is_expanded_before_reading() {
        let page = FakePage::at("about:blank")
            .with("button.more", vec![FakeElement::new("more", "Voir plus")])
            .with("#content", vec![FakeElement::new("c", "Missions")])
            .reveals(
                "more",
                "#content",
                vec![FakeElement::new("c", "Missions\nProfil recherché")],
            );
        let recorder = page.recorder();
        let (jobs, _dir) = source_for(TestSite::expanding(), Some(page));

        assert_eq!(jobs.get_details(JOB).as_deref(), Some("Missions\nProfil recherché"));
        assert_eq!(recorder.clicks.borrow().clone(), vec!["more"]);
    }

    #[test]
    fn test_missing_container_gives_no_details() {
        let (jobs, _dir) = source(Some(FakePage::at("about:blank")));
        assert!(jobs.fetch_detail(JOB).is_none());
    }

    #[test]
    fn test_unreachable_job_page_gives_no_details() {
        let page = FakePage::at("about:blank").unreachable(JOB);
        let recorder = page.recorder();
        let (jobs, _dir) = source(Some(page));
        assert!(jobs.get_details(JOB).is_none());
        assert!(recorder.closed.get());
    }

    #[test]
    fn test_attach_details_skips_linkless_jobs() {
        let (jobs, _dir) = source(None);
        let mut found = vec![JobSummary::default()];
        assert_eq!(jobs.attach_details(&mut found), 0);
        assert_eq!(found[0].detail_text, None);
    }
}
