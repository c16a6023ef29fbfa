// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chromium browser adapter for Chatharvest.
//!
//! Implements [`BrowserSession`] and [`SessionFactory`] over the Chrome
//! DevTools Protocol via chromiumoxide. Each session owns one browser
//! process and one working tab; detail pages are fetched in short-lived
//! extra tabs.

pub mod script;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chatharvest_config::model::BrowserConfig;
use chatharvest_core::{
    AdapterType, BrowserSession, HarvestError, HealthStatus, PluginAdapter, SessionFactory,
};
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::{Handler, Page};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Poll interval while waiting for a detached tab to render.
const DETACHED_POLL: Duration = Duration::from_millis(250);

fn cdp_err(context: &str, e: impl std::error::Error + Send + Sync + 'static) -> HarvestError {
    HarvestError::Browser {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Launches a fresh Chromium per session.
pub struct ChromeSessionFactory {
    config: BrowserConfig,
}

impl ChromeSessionFactory {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    fn cdp_config(&self) -> Result<CdpConfig, HarvestError> {
        let mut builder = CdpConfig::builder()
            .launch_timeout(Duration::from_secs(self.config.launch_timeout_secs));
        if !self.config.headless {
            builder = builder.with_head();
        }
        if let Some(exe) = &self.config.executable {
            builder = builder.chrome_executable(PathBuf::from(exe));
        }
        if let Some(dir) = &self.config.user_data_dir {
            builder = builder.user_data_dir(PathBuf::from(dir));
        }
        builder.build().map_err(HarvestError::browser)
    }
}

#[async_trait]
impl SessionFactory for ChromeSessionFactory {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, HarvestError> {
        let config = self.cdp_config()?;
        info!(headless = self.config.headless, "launching browser");

        let (browser, handler) = Browser::launch(config)
            .await
            .map_err(|e| cdp_err("browser failed to start", e))?;
        let closed = Arc::new(AtomicBool::new(false));
        let handler_task = spawn_handler_task(handler, Arc::clone(&closed));

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(cdp_err("could not open a tab", e));
            }
        };

        Ok(Box::new(ChromeSession {
            browser: Mutex::new(browser),
            page,
            handler_task,
            closed,
        }))
    }
}

/// Drains CDP events until the connection drops.
fn spawn_handler_task(mut handler: Handler, closed: Arc<AtomicBool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!(error = %e, "cdp handler event error");
            }
        }
        closed.store(true, Ordering::SeqCst);
    })
}

/// One Chromium process with a single working tab.
pub struct ChromeSession {
    browser: Mutex<Browser>,
    page: Page,
    handler_task: JoinHandle<()>,
    closed: Arc<AtomicBool>,
}

impl ChromeSession {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn eval_on(page: &Page, script: String) -> Result<serde_json::Value, HarvestError> {
        let result = page
            .evaluate(script)
            .await
            .map_err(|e| cdp_err("script failed", e))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn count_on(page: &Page, selector: &str) -> Result<usize, HarvestError> {
        let value = Self::eval_on(page, script::count(selector)).await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }
}

#[async_trait]
impl PluginAdapter for ChromeSession {
    fn name(&self) -> &str {
        "chromium"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Browser
    }

    async fn health_check(&self) -> Result<HealthStatus, HarvestError> {
        if self.is_closed() {
            return Ok(HealthStatus::Unhealthy("devtools connection closed".into()));
        }
        match self.page.evaluate("1 + 1").await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Degraded(format!("page not responding: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), HarvestError> {
        debug!("closing browser");
        let mut browser = self.browser.lock().await;
        let closed = browser.close().await;
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "browser process did not exit cleanly");
        }
        self.handler_task.abort();
        self.closed.store(true, Ordering::SeqCst);
        closed
            .map(|_| ())
            .map_err(|e| cdp_err("browser close failed", e))
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&self, url: &str) -> Result<(), HarvestError> {
        if self.is_closed() {
            return Err(HarvestError::Navigation {
                url: url.to_string(),
                message: "devtools connection closed".to_string(),
            });
        }
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| HarvestError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn page_source(&self) -> Result<String, HarvestError> {
        self.page
            .content()
            .await
            .map_err(|e| cdp_err("could not read page source", e))
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, HarvestError> {
        Self::eval_on(&self.page, script.to_string()).await
    }

    async fn count(&self, selector: &str) -> Result<usize, HarvestError> {
        Self::count_on(&self.page, selector).await
    }

    async fn click(&self, selector: &str) -> Result<(), HarvestError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| cdp_err(&format!("no element for `{selector}`"), e))?;
        element
            .click()
            .await
            .map_err(|e| cdp_err(&format!("click on `{selector}` failed"), e))?;
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), HarvestError> {
        Self::eval_on(&self.page, script::clear_value(selector)).await?;
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| cdp_err(&format!("no element for `{selector}`"), e))?;
        element
            .click()
            .await
            .map_err(|e| cdp_err(&format!("focus on `{selector}` failed"), e))?
            .type_str(text)
            .await
            .map_err(|e| cdp_err(&format!("typing into `{selector}` failed"), e))?;
        Ok(())
    }

    async fn fetch_detached(
        &self,
        url: &str,
        ready_selector: &str,
        timeout: Duration,
    ) -> Result<Option<String>, HarvestError> {
        let tab = {
            let browser = self.browser.lock().await;
            browser
                .new_page(url)
                .await
                .map_err(|e| cdp_err(&format!("could not open {url}"), e))?
        };

        let deadline = tokio::time::Instant::now() + timeout;
        let html = loop {
            if Self::count_on(&tab, ready_selector).await.unwrap_or(0) > 0 {
                break tab.content().await.ok();
            }
            if tokio::time::Instant::now() >= deadline {
                debug!(url, ready_selector, "detached tab never became ready");
                break None;
            }
            tokio::time::sleep(DETACHED_POLL).await;
        };

        if let Err(e) = tab.close().await {
            warn!(url, error = %e, "could not close detached tab");
        }
        Ok(html)
    }
}
