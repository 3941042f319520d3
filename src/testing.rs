//! In-memory page double for unit tests: selectors are looked up verbatim,
//! interactions are recorded.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use crate::browser::{Element, Locator, Page};
use crate::config::Config;
use crate::cookie_store::CookieRecord;
use crate::detail::DetailLayout;
use crate::error::{Result, ScrapeError};
use crate::extractor::{CardLayout, FieldRule};
use crate::models::SearchCriteria;
use crate::sites::SiteAdapter;

#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    pub id: String,
    pub text: String,
    pub attrs: HashMap<String, String>,
    pub children: HashMap<String, Vec<FakeElement>>,
    pub stale: bool,
    pub hidden: bool,
}

impl FakeElement {
    pub fn new(id: &str, text: &str) -> Self {
        FakeElement {
            id: id.to_string(),
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn child(mut self, css: &str, element: FakeElement) -> Self {
        self.children.entry(css.to_string()).or_default().push(element);
        self
    }

    pub fn stale(mut self) -> Self {
        self.stale = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// Interaction log shared between a [`FakePage`] and the test that built it,
/// so it can still be inspected after the page is boxed and moved away.
#[derive(Debug, Default)]
pub struct Recorder {
    pub clicks: RefCell<Vec<String>>,
    pub typed: RefCell<Vec<(String, String)>>,
    pub navigations: RefCell<Vec<String>>,
    pub refreshes: Cell<usize>,
    pub closed: Cell<bool>,
    pub jar: RefCell<Vec<CookieRecord>>,
}

pub struct FakePage {
    url: String,
    elements: HashMap<String, Vec<FakeElement>>,
    scripted: RefCell<HashMap<String, VecDeque<Vec<FakeElement>>>>,
    per_url: HashMap<String, HashMap<String, Vec<FakeElement>>>,
    on_click: HashMap<String, (String, Vec<FakeElement>)>,
    revealed: RefCell<HashMap<String, Vec<FakeElement>>>,
    rejected: HashSet<String>,
    unreachable: HashSet<String>,
    recorder: Rc<Recorder>,
}

impl FakePage {
    pub fn at(url: &str) -> Self {
        FakePage {
            url: url.to_string(),
            elements: HashMap::new(),
            scripted: RefCell::new(HashMap::new()),
            per_url: HashMap::new(),
            on_click: HashMap::new(),
            revealed: RefCell::new(HashMap::new()),
            rejected: HashSet::new(),
            unreachable: HashSet::new(),
            recorder: Rc::new(Recorder::default()),
        }
    }

    pub fn with(mut self, css: &str, elements: Vec<FakeElement>) -> Self {
        self.elements.insert(css.to_string(), elements);
        self
    }

    /// Elements that only exist while the page is at `url`.
    pub fn on(mut self, url: &str, css: &str, elements: Vec<FakeElement>) -> Self {
        self.per_url
            .entry(url.to_string())
            .or_default()
            .insert(css.to_string(), elements);
        self
    }

    /// Successive `find_all(css)` calls return successive batches; the last
    /// batch repeats once the script runs out.
    pub fn script(self, css: &str, batches: Vec<Vec<FakeElement>>) -> Self {
        self.scripted
            .borrow_mut()
            .insert(css.to_string(), batches.into_iter().collect());
        self
    }

    /// Clicking the element `id` replaces whatever `css` matched with `elements`.
    pub fn reveals(mut self, id: &str, css: &str, elements: Vec<FakeElement>) -> Self {
        self.on_click
            .insert(id.to_string(), (css.to_string(), elements));
        self
    }

    pub fn with_jar(self, jar: Vec<CookieRecord>) -> Self {
        *self.recorder.jar.borrow_mut() = jar;
        self
    }

    /// Navigating to `url` fails.
    pub fn unreachable(mut self, url: &str) -> Self {
        self.unreachable.insert(url.to_string());
        self
    }

    pub fn reject_cookie(&mut self, name: &str) {
        self.rejected.insert(name.to_string());
    }

    pub fn recorder(&self) -> Rc<Recorder> {
        Rc::clone(&self.recorder)
    }

    pub fn clicks(&self) -> Vec<String> {
        self.recorder.clicks.borrow().clone()
    }

    pub fn typed(&self) -> Vec<(String, String)> {
        self.recorder.typed.borrow().clone()
    }

    pub fn cookie_jar(&self) -> Vec<CookieRecord> {
        self.recorder.jar.borrow().clone()
    }

    fn lookup(&self, css: &str) -> Vec<FakeElement> {
        if let Some(shown) = self.revealed.borrow().get(css) {
            return shown.clone();
        }
        if let Some(page) = self.per_url.get(&self.url) {
            return page.get(css).cloned().unwrap_or_default();
        }
        let mut scripted = self.scripted.borrow_mut();
        if let Some(batches) = scripted.get_mut(css) {
            return if batches.len() > 1 {
                batches.pop_front().unwrap_or_default()
            } else {
                batches.front().cloned().unwrap_or_default()
            };
        }
        self.elements.get(css).cloned().unwrap_or_default()
    }

    fn peek(&self, css: &str) -> bool {
        if let Some(shown) = self.revealed.borrow().get(css) {
            return !shown.is_empty();
        }
        if let Some(page) = self.per_url.get(&self.url) {
            return page.get(css).map_or(false, |e| !e.is_empty());
        }
        if let Some(batches) = self.scripted.borrow().get(css) {
            return batches.front().map_or(false, |b| !b.is_empty());
        }
        self.elements.get(css).map_or(false, |e| !e.is_empty())
    }
}

impl Page for FakePage {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.recorder.navigations.borrow_mut().push(url.to_string());
        if self.unreachable.contains(url) {
            return Err(ScrapeError::navigation(url, "net::ERR_CONNECTION_RESET"));
        }
        self.url = url.to_string();
        Ok(())
    }

    fn current_url(&self) -> String {
        self.url.clone()
    }

    fn refresh(&mut self) -> Result<()> {
        self.recorder.refreshes.set(self.recorder.refreshes.get() + 1);
        Ok(())
    }

    fn wait_for(&self, css: &str, _timeout: Duration) -> bool {
        self.peek(css)
    }

    fn find(&self, css: &str) -> Result<Option<Box<dyn Element + '_>>> {
        Ok(self.find_all(css)?.into_iter().next())
    }

    fn find_all(&self, css: &str) -> Result<Vec<Box<dyn Element + '_>>> {
        Ok(self
            .lookup(css)
            .into_iter()
            .map(|el| Box::new(FakeHandle { el, page: self }) as Box<dyn Element + '_>)
            .collect())
    }

    fn cookies(&self) -> Result<Vec<CookieRecord>> {
        Ok(self.cookie_jar())
    }

    fn add_cookie(&mut self, cookie: &CookieRecord) -> Result<()> {
        if self.rejected.contains(&cookie.name) {
            return Err(ScrapeError::Browser(anyhow::anyhow!("invalid cookie field")));
        }
        self.recorder.jar.borrow_mut().push(cookie.clone());
        Ok(())
    }

    fn close(&mut self) {
        self.recorder.closed.set(true);
    }
}

struct FakeHandle<'a> {
    el: FakeElement,
    page: &'a FakePage,
}

impl FakeHandle<'_> {
    fn live(&self) -> Result<&FakeElement> {
        if self.el.stale {
            Err(ScrapeError::StaleElement)
        } else {
            Ok(&self.el)
        }
    }
}

impl Element for FakeHandle<'_> {
    fn id(&self) -> String {
        self.el.id.clone()
    }

    fn text(&self) -> Result<String> {
        Ok(self.live()?.text.clone())
    }

    fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.live()?.attrs.get(name).cloned())
    }

    fn find(&self, css: &str) -> Result<Option<Box<dyn Element + '_>>> {
        Ok(self.find_all(css)?.into_iter().next())
    }

    fn find_all(&self, css: &str) -> Result<Vec<Box<dyn Element + '_>>> {
        let children = self.live()?.children.get(css).cloned().unwrap_or_default();
        Ok(children
            .into_iter()
            .map(|el| Box::new(FakeHandle { el, page: self.page }) as Box<dyn Element + '_>)
            .collect())
    }

    fn click(&self) -> Result<()> {
        self.live()?;
        self.page.recorder.clicks.borrow_mut().push(self.el.id.clone());
        if let Some((css, elements)) = self.page.on_click.get(&self.el.id) {
            self.page
                .revealed
                .borrow_mut()
                .insert(css.clone(), elements.clone());
        }
        Ok(())
    }

    fn type_text(&self, text: &str) -> Result<()> {
        self.live()?;
        self.page
            .recorder
            .typed
            .borrow_mut()
            .push((self.el.id.clone(), text.to_string()));
        Ok(())
    }

    fn is_displayed(&self) -> Result<bool> {
        Ok(!self.live()?.hidden)
    }

    fn scroll_into_view(&self) -> Result<()> {
        self.live().map(|_| ())
    }
}

pub const TEST_HOME: &str = "https://www.example.com/";
pub const TEST_SEARCH: &str = "https://www.example.com/jobs?q=data";

static TEST_CARDS: CardLayout = CardLayout {
    card: ".card",
    title: Some(FieldRule::text("h3")),
    company: None,
    location: None,
    link: Some(FieldRule::link("a")),
};

static TEST_DETAIL: DetailLayout = DetailLayout {
    container: "#content",
    excluded: "button",
    section: "section",
    heading: "h2",
    lead_paragraph: "p",
    fallback: None,
    expand: &[],
};

static TEST_EXPANDING_DETAIL: DetailLayout = DetailLayout {
    container: "#content",
    excluded: "button",
    section: "section",
    heading: "h2",
    lead_paragraph: "p",
    fallback: None,
    expand: &[Locator::css("button.more")],
};

/// Minimal adapter: counts ritual runs and reports a fixed outcome.
pub struct TestSite {
    pub rituals: Cell<usize>,
    pub ritual_succeeds: bool,
    detail: &'static DetailLayout,
}

impl TestSite {
    pub fn new(ritual_succeeds: bool) -> Self {
        TestSite {
            rituals: Cell::new(0),
            ritual_succeeds,
            detail: &TEST_DETAIL,
        }
    }

    /// Job pages fold their description behind a `button.more` control.
    pub fn expanding() -> Self {
        TestSite {
            detail: &TEST_EXPANDING_DETAIL,
            ..TestSite::new(false)
        }
    }
}

impl SiteAdapter for TestSite {
    fn name(&self) -> &'static str {
        "Example"
    }

    fn domain_key(&self) -> &'static str {
        "example.com"
    }

    fn home_url(&self) -> &'static str {
        TEST_HOME
    }

    fn search_url(&self, _criteria: &SearchCriteria) -> String {
        TEST_SEARCH.to_string()
    }

    fn page_param(&self) -> &'static str {
        "page"
    }

    fn card_layout(&self) -> &'static CardLayout {
        &TEST_CARDS
    }

    fn detail_layout(&self) -> &'static DetailLayout {
        self.detail
    }

    fn establish_session(&self, _page: &dyn Page, _config: &Config) -> bool {
        self.rituals.set(self.rituals.get() + 1);
        self.ritual_succeeds
    }
}

/// A result card readable through the test layout.
pub fn test_card(id: &str, title: &str) -> FakeElement {
    FakeElement::new(id, "")
        .child("h3", FakeElement::new(&format!("{}-h3", id), title))
        .child("a", FakeElement::new(&format!("{}-a", id), "").attr("href", &format!("/job/{}", id)))
}
