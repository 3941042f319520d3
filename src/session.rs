//! Browser sessions: launching, restoring persisted cookies or running the
//! site's consent/login ritual, and guaranteed teardown.

use log::{debug, error, info, warn};

use crate::browser::{Launcher, Page};
use crate::chrome::ChromeLauncher;
use crate::config::{Backend, Config};
use crate::cookie_store::{apply_cookies, CookieStore};
use crate::delay_manager;
use crate::error::Result;
use crate::fetcher::HttpLauncher;
use crate::sites::SiteAdapter;

/// A page scoped to one operation. The page is closed exactly once, when
/// the session is closed or dropped, on every exit path.
pub struct Session {
    page: Box<dyn Page>,
    domain_key: String,
    store: CookieStore,
    closed: bool,
}

impl Session {
    pub fn new(page: Box<dyn Page>, domain_key: impl Into<String>, store: CookieStore) -> Self {
        Session {
            page,
            domain_key: domain_key.into(),
            store,
            closed: false,
        }
    }

    pub fn page(&self) -> &dyn Page {
        self.page.as_ref()
    }

    pub fn page_mut(&mut self) -> &mut dyn Page {
        self.page.as_mut()
    }

    pub fn domain_key(&self) -> &str {
        &self.domain_key
    }

    /// Snapshots the page's cookies to disk. Failures are logged, never raised.
    pub fn persist_cookies(&self) -> usize {
        let cookies = match self.page.cookies() {
            Ok(cookies) => cookies,
            Err(e) => {
                warn!("Could not read cookies for {}: {}", self.domain_key, e);
                return 0;
            }
        };
        match self.store.save(&self.domain_key, &cookies) {
            Ok(saved) => saved,
            Err(e) => {
                warn!("Could not save cookies for {}: {}", self.domain_key, e);
                0
            }
        }
    }

    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if !self.closed {
            self.closed = true;
            self.page.close();
            debug!("Closed session for {}", self.domain_key);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Opens ready-to-use sessions for a site.
pub struct SessionManager {
    config: Config,
    store: CookieStore,
    launcher: Box<dyn Launcher>,
}

impl SessionManager {
    pub fn new(config: Config) -> Self {
        let launcher: Box<dyn Launcher> = match config.backend {
            Backend::Chrome => Box::new(ChromeLauncher),
            Backend::Http => Box::new(HttpLauncher),
        };
        Self::with_launcher(config, launcher)
    }

    pub fn with_launcher(config: Config, launcher: Box<dyn Launcher>) -> Self {
        let store = CookieStore::new(config.cookies_dir.clone());
        SessionManager {
            config,
            store,
            launcher,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Launches a page on the site's landing URL with its session state
    /// restored or freshly established. `None` if the page cannot be brought up.
    pub fn open(&self, adapter: &dyn SiteAdapter) -> Option<Session> {
        match self.try_open(adapter) {
            Ok(session) => Some(session),
            Err(e) => {
                error!("Error setting up browser session for {}: {}", adapter.name(), e);
                None
            }
        }
    }

    fn try_open(&self, adapter: &dyn SiteAdapter) -> Result<Session> {
        let page = self.launcher.launch(&self.config)?;
        let mut session = Session::new(page, adapter.domain_key(), self.store.clone());

        session.page_mut().navigate(adapter.home_url())?;
        delay_manager::page_delay(self.config.page_wait);

        if self.restore(&mut session) {
            return Ok(session);
        }

        if adapter.establish_session(session.page(), &self.config) {
            session.persist_cookies();
        }
        Ok(session)
    }

    /// Applies persisted cookies. `true` only if at least one took, in which
    /// case the page is reloaded so they apply.
    fn restore(&self, session: &mut Session) -> bool {
        let records = match self.store.load(session.domain_key()) {
            Ok(Some(records)) => records,
            Ok(None) => return false,
            Err(e) => {
                warn!("Unreadable cookie file for {}: {}", session.domain_key(), e);
                return false;
            }
        };

        let report = apply_cookies(session.page_mut(), &records);
        if !report.restored() {
            info!("No stored cookies applied for {}, establishing a new session", session.domain_key());
            return false;
        }
        if let Err(e) = session.page_mut().refresh() {
            warn!("Refresh after restoring cookies failed: {}", e);
        }
        delay_manager::page_delay(self.config.page_wait);
        true
    }
}
