// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory browser for deterministic scraping tests.
//!
//! `MockBrowser` serves canned HTML by URL and answers selector queries by
//! parsing that HTML with `scraper`, so the code under test sees the same
//! element counts a real page would give. Navigation failures, click-driven
//! page changes and lazy-load growth can all be scripted.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};

use chatharvest_core::{
    AdapterType, BrowserSession, HarvestError, HealthStatus, PluginAdapter, SessionFactory,
};

const BLANK_PAGE: &str = "<html><head></head><body></body></html>";

#[derive(Default)]
struct BrowserState {
    pages: HashMap<String, String>,
    current_html: String,
    current_url: Option<String>,
    failing_urls: HashSet<String>,
    fail_all: bool,
    scripted_counts: HashMap<String, VecDeque<usize>>,
    click_pages: HashMap<String, VecDeque<String>>,
    script_pages: VecDeque<String>,
    visited: Vec<String>,
    clicks: Vec<String>,
    typed: Vec<(String, String)>,
    scripts: Vec<String>,
    detached: Vec<String>,
    shut_down: bool,
}

/// A fake [`BrowserSession`].
///
/// Clones share state, so a test can keep a handle for assertions after
/// boxing one copy into the code under test.
#[derive(Clone, Default)]
pub struct MockBrowser {
    state: Arc<Mutex<BrowserState>>,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BrowserState> {
        self.state.lock().unwrap()
    }

    /// Serve `html` when `url` is loaded.
    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.state().pages.insert(url.into(), html.into());
        self
    }

    /// Make the current document `html` without a navigation, as if the
    /// operator had left that page open.
    pub fn showing(self, html: impl Into<String>) -> Self {
        self.state().current_html = html.into();
        self
    }

    /// Loading `url` fails with a navigation error.
    pub fn failing_on(self, url: impl Into<String>) -> Self {
        self.state().failing_urls.insert(url.into());
        self
    }

    /// Every navigation fails, as with a dead browser process.
    pub fn failing_everywhere(self) -> Self {
        self.state().fail_all = true;
        self
    }

    /// Answer `count(selector)` from `counts`, one value per call. The last
    /// value repeats once the script runs out.
    pub fn with_counts(self, selector: &str, counts: impl IntoIterator<Item = usize>) -> Self {
        self.state()
            .scripted_counts
            .insert(selector.to_string(), counts.into_iter().collect());
        self
    }

    /// Clicking `selector` replaces the current document with `html`.
    /// Repeated registrations queue up for successive clicks.
    pub fn on_click(self, selector: &str, html: impl Into<String>) -> Self {
        self.state()
            .click_pages
            .entry(selector.to_string())
            .or_default()
            .push_back(html.into());
        self
    }

    /// The next `evaluate` call replaces the current document with `html`,
    /// as a scroll that lazy-loads older history would. Queues like
    /// [`on_click`](Self::on_click).
    pub fn on_script(self, html: impl Into<String>) -> Self {
        self.state().script_pages.push_back(html.into());
        self
    }

    /// URLs passed to `navigate`, including failed attempts.
    pub fn visited(&self) -> Vec<String> {
        self.state().visited.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state().clicks.clone()
    }

    /// (selector, text) pairs passed to `type_text`.
    pub fn typed(&self) -> Vec<(String, String)> {
        self.state().typed.clone()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.state().scripts.clone()
    }

    /// URLs opened through `fetch_detached`.
    pub fn detached(&self) -> Vec<String> {
        self.state().detached.clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.state().shut_down
    }

    pub fn current_url(&self) -> Option<String> {
        self.state().current_url.clone()
    }
}

fn parse_selector(selector: &str) -> Result<Selector, HarvestError> {
    Selector::parse(selector)
        .map_err(|e| HarvestError::browser(format!("invalid selector `{selector}`: {e}")))
}

fn count_in(html: &str, selector: &str) -> Result<usize, HarvestError> {
    let selector = parse_selector(selector)?;
    Ok(Html::parse_document(html).select(&selector).count())
}

#[async_trait]
impl PluginAdapter for MockBrowser {
    fn name(&self) -> &str {
        "mock-browser"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Browser
    }

    async fn health_check(&self) -> Result<HealthStatus, HarvestError> {
        if self.state().shut_down {
            Ok(HealthStatus::Unhealthy("shut down".to_string()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn shutdown(&self) -> Result<(), HarvestError> {
        self.state().shut_down = true;
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for MockBrowser {
    async fn navigate(&self, url: &str) -> Result<(), HarvestError> {
        let mut state = self.state();
        state.visited.push(url.to_string());
        if state.shut_down || state.fail_all || state.failing_urls.contains(url) {
            return Err(HarvestError::Navigation {
                url: url.to_string(),
                message: "session not responding".to_string(),
            });
        }
        state.current_html = state
            .pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| BLANK_PAGE.to_string());
        state.current_url = Some(url.to_string());
        Ok(())
    }

    async fn page_source(&self) -> Result<String, HarvestError> {
        Ok(self.state().current_html.clone())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, HarvestError> {
        let mut state = self.state();
        state.scripts.push(script.to_string());
        if let Some(next) = state.script_pages.pop_front() {
            state.current_html = next;
        }
        Ok(serde_json::Value::Null)
    }

    async fn count(&self, selector: &str) -> Result<usize, HarvestError> {
        let mut state = self.state();
        if let Some(script) = state.scripted_counts.get_mut(selector) {
            let value = if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().copied()
            };
            if let Some(value) = value {
                return Ok(value);
            }
        }
        count_in(&state.current_html, selector)
    }

    async fn click(&self, selector: &str) -> Result<(), HarvestError> {
        let mut state = self.state();
        if count_in(&state.current_html, selector)? == 0 {
            return Err(HarvestError::browser(format!("no element matches `{selector}`")));
        }
        state.clicks.push(selector.to_string());
        if let Some(next) = state
            .click_pages
            .get_mut(selector)
            .and_then(|queue| queue.pop_front())
        {
            state.current_html = next;
        }
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), HarvestError> {
        let mut state = self.state();
        if count_in(&state.current_html, selector)? == 0 {
            return Err(HarvestError::browser(format!("no element matches `{selector}`")));
        }
        state.typed.push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn fetch_detached(
        &self,
        url: &str,
        ready_selector: &str,
        _timeout: Duration,
    ) -> Result<Option<String>, HarvestError> {
        let mut state = self.state();
        state.detached.push(url.to_string());
        if state.fail_all || state.failing_urls.contains(url) {
            return Err(HarvestError::browser(format!("could not open {url}")));
        }
        let Some(html) = state.pages.get(url).cloned() else {
            return Ok(None);
        };
        if count_in(&html, ready_selector)? == 0 {
            return Ok(None);
        }
        Ok(Some(html))
    }
}

/// Hands out pre-built [`MockBrowser`]s, one per `launch`.
#[derive(Default)]
pub struct MockSessionFactory {
    sessions: Mutex<VecDeque<MockBrowser>>,
    launches: AtomicUsize,
}

impl MockSessionFactory {
    pub fn new(sessions: impl IntoIterator<Item = MockBrowser>) -> Self {
        Self {
            sessions: Mutex::new(sessions.into_iter().collect()),
            launches: AtomicUsize::new(0),
        }
    }

    /// Number of `launch` calls, including failed ones.
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for MockSessionFactory {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, HarvestError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        match self.sessions.lock().unwrap().pop_front() {
            Some(browser) => Ok(Box::new(browser)),
            None => Err(HarvestError::browser("browser failed to start")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_pages_and_counts_selectors() {
        let browser = MockBrowser::new().with_page(
            "https://crm.example/a",
            "<div id='x'><p>1</p><p>2</p></div>",
        );
        browser.navigate("https://crm.example/a").await.unwrap();
        assert_eq!(browser.count("#x p").await.unwrap(), 2);
        assert_eq!(browser.current_url().as_deref(), Some("https://crm.example/a"));
        assert!(browser.page_source().await.unwrap().contains("id='x'"));
    }

    #[tokio::test]
    async fn scripted_counts_repeat_last_value() {
        let browser = MockBrowser::new().with_counts("div", [1, 4]);
        assert_eq!(browser.count("div").await.unwrap(), 1);
        assert_eq!(browser.count("div").await.unwrap(), 4);
        assert_eq!(browser.count("div").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn failing_url_reports_navigation_error() {
        let browser = MockBrowser::new().failing_on("https://crm.example/dead");
        let err = browser.navigate("https://crm.example/dead").await.unwrap_err();
        assert!(matches!(err, HarvestError::Navigation { .. }));
        assert_eq!(browser.visited(), vec!["https://crm.example/dead"]);
    }

    #[tokio::test]
    async fn click_swaps_document() {
        let browser = MockBrowser::new()
            .showing("<a class='next'>next</a>")
            .on_click("a.next", "<p>page 2</p>");
        browser.click("a.next").await.unwrap();
        assert_eq!(browser.count("p").await.unwrap(), 1);
        assert!(browser.click("a.next").await.is_err());
    }

    #[tokio::test]
    async fn script_swaps_document_once() {
        let browser = MockBrowser::new()
            .showing("<p>new</p>")
            .on_script("<p>old</p><p>new</p>");
        browser.evaluate("window.scrollTo(0, 0)").await.unwrap();
        assert_eq!(browser.count("p").await.unwrap(), 2);
        browser.evaluate("window.scrollTo(0, 0)").await.unwrap();
        assert_eq!(browser.count("p").await.unwrap(), 2);
        assert_eq!(browser.scripts().len(), 2);
    }

    #[tokio::test]
    async fn factory_runs_dry() {
        let factory = MockSessionFactory::new([MockBrowser::new()]);
        assert!(factory.launch().await.is_ok());
        assert!(factory.launch().await.is_err());
        assert_eq!(factory.launches(), 2);
    }
}
