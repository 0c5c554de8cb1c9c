//! Chromium-backed page source using chromiumoxide.

use chromiumoxide::Page;
use chromiumoxide::browser::Browser;
use log::{debug, info, warn};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::js_scripts::{
    MARK_DOCUMENT_SCRIPT, NAVIGATION_PROBE_SCRIPT, SCROLL_TO_BOTTOM_SCRIPT,
    click_next_control_script, document_snapshot_script, next_control_probe_script,
};
use super::{
    Advance, DocumentSnapshot, ImageSettleTracker, NextPageControl, PageSource, PageState,
    SettleStatus,
};
use crate::browser_setup::{LaunchedBrowser, launch_browser};
use crate::config::HarvestConfig;
use crate::crawl_engine::cleanup::{CleanupResult, cleanup_browser_and_data};
use crate::crawl_engine::crawl_types::CrawlError;
use crate::crawl_engine::page_timeout::{PollResult, poll_until, with_page_timeout};
use crate::utils::POLL_INTERVAL_MS;

/// Upper bound for a single probe script evaluation
const PROBE_EVAL_TIMEOUT: Duration = Duration::from_secs(2);

/// Timing and selector settings for rendering
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub page_load_timeout_secs: u64,
    pub render_timeout: Duration,
    pub next_page_timeout: Duration,
    pub next_page_selector: String,
    pub image_selector: String,
    pub poll_interval: Duration,
}

impl RenderSettings {
    #[must_use]
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self {
            page_load_timeout_secs: config.page_load_timeout_secs(),
            render_timeout: config.render_timeout(),
            next_page_timeout: config.next_page_timeout(),
            next_page_selector: config.next_page_selector().to_string(),
            image_selector: config.image_selector().to_string(),
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct NextControlProbe {
    found: bool,
    href: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NavigationProbe {
    fresh: bool,
    ready_state: String,
}

/// One headless Chromium session with a single tab
pub struct ChromiumPageSource {
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    user_data_dir: Option<PathBuf>,
    page: Option<Page>,
    settings: RenderSettings,
}

impl ChromiumPageSource {
    /// Launch a browser for one crawl
    pub async fn launch(config: &HarvestConfig) -> Result<Self, CrawlError> {
        let LaunchedBrowser {
            browser,
            handler,
            user_data_dir,
        } = launch_browser(config.headless(), config.chrome_data_dir().cloned())
            .await
            .map_err(|e| CrawlError::Browser(format!("{e:#}")))?;

        Ok(Self {
            browser: Some(browser),
            handler: Some(handler),
            user_data_dir: Some(user_data_dir),
            page: None,
            settings: RenderSettings::from_config(config),
        })
    }

    async fn page(&mut self) -> Result<Page, CrawlError> {
        if let Some(page) = &self.page {
            return Ok(page.clone());
        }

        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| CrawlError::Browser("browser session already closed".to_string()))?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| CrawlError::Browser(format!("Failed to create page: {e}")))?;

        self.page = Some(page.clone());
        Ok(page)
    }

    /// Scroll to the bottom and wait for the image set to stop changing
    async fn settle(&self, page: &Page) -> SettleStatus {
        if let Err(e) = page.evaluate(SCROLL_TO_BOTTOM_SCRIPT).await {
            warn!("Failed to scroll page for lazy-loaded content: {e}");
        }

        let script = document_snapshot_script(&self.settings.image_selector);
        let mut tracker = ImageSettleTracker::new();

        let result = poll_until(
            self.settings.render_timeout,
            self.settings.poll_interval,
            || evaluate_probe::<DocumentSnapshot>(page, script.clone()),
            |snapshot| tracker.observe(snapshot),
        )
        .await;

        match result {
            PollResult::Ready(snapshot) => {
                debug!("Page settled with {} images", snapshot.image_count);
                SettleStatus::Settled
            }
            PollResult::TimedOut(last) => {
                warn!(
                    "Render timeout after {:?}; continuing with partial document ({} images seen)",
                    self.settings.render_timeout,
                    last.map_or(0, |s| s.image_count)
                );
                SettleStatus::TimedOut
            }
        }
    }

    /// Capture the current document as a [`PageState`]
    async fn capture(&self, page: &Page, requested_url: &str, settle: SettleStatus) -> Result<PageState, CrawlError> {
        let html = page
            .content()
            .await
            .map_err(|e| CrawlError::Browser(format!("Failed to read rendered document: {e}")))?;

        let url = match page.url().await {
            Ok(Some(url)) if url != "about:blank" => url,
            _ => requested_url.to_string(),
        };

        let probe = evaluate_probe::<NextControlProbe>(
            page,
            next_control_probe_script(&self.settings.next_page_selector),
        )
        .await;
        let next_page = probe.filter(|p| p.found).map(|p| NextPageControl {
            selector: self.settings.next_page_selector.clone(),
            href: p.href,
        });

        Ok(PageState {
            url,
            html,
            next_page,
            settle,
        })
    }
}

impl PageSource for ChromiumPageSource {
    async fn render(&mut self, url: &str) -> Result<PageState, CrawlError> {
        let page = self.page().await?;

        info!("Rendering {url}");
        with_page_timeout(
            async {
                page.goto(url)
                    .await
                    .map(|_| ())
                    .map_err(|e| anyhow::anyhow!("{e}"))
            },
            self.settings.page_load_timeout_secs,
            "Page navigation",
        )
        .await
        .map_err(|e| CrawlError::Browser(format!("Navigation to {url} failed: {e:#}")))?;

        let settle = self.settle(&page).await;
        self.capture(&page, url, settle).await
    }

    async fn advance(&mut self, current: &PageState) -> Result<Advance, CrawlError> {
        let page = self.page().await?;
        let probe_script = next_control_probe_script(&self.settings.next_page_selector);

        let located = poll_until(
            self.settings.next_page_timeout,
            self.settings.poll_interval,
            || evaluate_probe::<NextControlProbe>(&page, probe_script.clone()),
            |probe| probe.found,
        )
        .await;

        let PollResult::Ready(control) = located else {
            debug!("No next page control on {}", current.url);
            return Ok(Advance::NotFound);
        };

        // Tag the outgoing document, then click
        if let Err(e) = page.evaluate(MARK_DOCUMENT_SCRIPT).await {
            debug!("Failed to tag current document: {e}");
        }
        let clicked: bool = page
            .evaluate(click_next_control_script(&self.settings.next_page_selector))
            .await
            .map_err(|e| CrawlError::Browser(format!("Failed to activate next page control: {e}")))?
            .into_value()
            .unwrap_or(false);

        if !clicked {
            debug!("Next page control disappeared before it could be clicked on {}", current.url);
            return Ok(Advance::NotFound);
        }

        info!(
            "Following next page from {} (target: {})",
            current.url,
            control.href.as_deref().unwrap_or("script-driven")
        );

        let navigation = poll_until(
            self.settings.next_page_timeout,
            self.settings.poll_interval,
            || evaluate_probe::<NavigationProbe>(&page, NAVIGATION_PROBE_SCRIPT.to_string()),
            |probe| probe.fresh && probe.ready_state == "complete",
        )
        .await;

        if !navigation.is_ready() {
            warn!(
                "No navigation within {:?} after clicking next; using the in-place document",
                self.settings.next_page_timeout
            );
        }

        let settle = self.settle(&page).await;
        let fallback_url = control.href.unwrap_or_else(|| current.url.clone());
        let state = self.capture(&page, &fallback_url, settle).await?;
        Ok(Advance::Next(state))
    }

    async fn close(&mut self) -> Result<(), CrawlError> {
        if let Some(page) = self.page.take()
            && let Err(e) = page.close().await
        {
            debug!("Failed to close page: {e}");
        }

        let Some(browser) = self.browser.take() else {
            return Ok(());
        };

        match cleanup_browser_and_data(browser, self.handler.take(), self.user_data_dir.take()).await {
            CleanupResult::Success => info!("Browser session closed"),
            CleanupResult::PartialFailure(errors) => {
                warn!("Browser session closed with cleanup errors: {}", errors.join("; "));
            }
        }
        Ok(())
    }
}

impl Drop for ChromiumPageSource {
    fn drop(&mut self) {
        // Reached without close() only when the crawl future was dropped
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        if let Some(dir) = self.user_data_dir.take()
            && let Err(e) = std::fs::remove_dir_all(&dir)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!("Failed to remove Chrome data directory {}: {e}", dir.display());
        }
    }
}

/// Evaluate a probe script; any failure (including a navigation tearing down
/// the execution context) is reported as "no observation"
async fn evaluate_probe<T: DeserializeOwned>(page: &Page, script: String) -> Option<T> {
    match tokio::time::timeout(PROBE_EVAL_TIMEOUT, page.evaluate(script)).await {
        Ok(Ok(result)) => result.into_value::<T>().ok(),
        Ok(Err(e)) => {
            debug!("Probe evaluation failed: {e}");
            None
        }
        Err(_) => {
            debug!("Probe evaluation timed out after {PROBE_EVAL_TIMEOUT:?}");
            None
        }
    }
}
