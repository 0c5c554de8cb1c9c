//! Progress reporting abstraction for harvest operations
//!
//! Defines the `ProgressReporter` trait for lifecycle event reporting, a
//! no-op implementation for simple use cases, and a watch-channel backed
//! reporter that publishes a coarse [`HarvestStatus`] per invocation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::watch;

/// Trait for reporting harvest progress at key lifecycle events
///
/// Implementations can send updates to channels, log to console, update UI, etc.
pub trait ProgressReporter: Send + Sync {
    /// Report that browser initialization has started
    fn report_initializing(&self);

    /// Report that the browser has launched successfully
    fn report_browser_launched(&self);

    /// Report that a page was rendered and scanned
    ///
    /// `page_number` is 1-based; `settled` is false when the render timeout
    /// expired before the page's images stabilized.
    fn report_page_rendered(&self, page_number: usize, url: &str, image_count: usize, settled: bool);

    /// Report that pagination finished
    fn report_crawl_finished(&self, pages_visited: usize, references: usize);

    /// Report that one image finished materializing, successfully or not
    fn report_image_materialized(&self, index: usize, total: usize, success: bool);

    /// Report that the archive was written
    fn report_archived(&self, path: &Path, entries: usize);

    /// Report that the harvest has completed successfully
    fn report_completed(&self);

    /// Report an error that ended the harvest
    fn report_error(&self, error: &str);
}

/// Progress reporter that does nothing
#[derive(Debug, Clone, Copy)]
pub struct NoOpProgress;

impl ProgressReporter for NoOpProgress {
    #[inline(always)]
    fn report_initializing(&self) {}

    #[inline(always)]
    fn report_browser_launched(&self) {}

    #[inline(always)]
    fn report_page_rendered(&self, _page_number: usize, _url: &str, _image_count: usize, _settled: bool) {}

    #[inline(always)]
    fn report_crawl_finished(&self, _pages_visited: usize, _references: usize) {}

    #[inline(always)]
    fn report_image_materialized(&self, _index: usize, _total: usize, _success: bool) {}

    #[inline(always)]
    fn report_archived(&self, _path: &Path, _entries: usize) {}

    #[inline(always)]
    fn report_completed(&self) {}

    #[inline(always)]
    fn report_error(&self, _error: &str) {}
}

/// Coarse state of one harvest invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HarvestStatus {
    Idle,
    InProgress,
    Done,
    Failed(String),
}

impl HarvestStatus {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

/// Publishes [`HarvestStatus`] transitions on a watch channel
///
/// Each invocation owns its own reporter; observers hold a [`StatusHandle`].
#[derive(Debug)]
pub struct StatusReporter {
    tx: watch::Sender<HarvestStatus>,
}

/// Read side of a [`StatusReporter`]
#[derive(Debug, Clone)]
pub struct StatusHandle {
    rx: watch::Receiver<HarvestStatus>,
}

impl StatusReporter {
    #[must_use]
    pub fn new() -> (Self, StatusHandle) {
        let (tx, rx) = watch::channel(HarvestStatus::Idle);
        (Self { tx }, StatusHandle { rx })
    }

    fn publish(&self, status: HarvestStatus) {
        // Terminal states are sticky
        self.tx.send_if_modified(|current| {
            if current.is_terminal() || *current == status {
                return false;
            }
            *current = status;
            true
        });
    }
}

impl StatusHandle {
    #[must_use]
    pub fn current(&self) -> HarvestStatus {
        self.rx.borrow().clone()
    }

    /// Wait until the harvest reaches `Done` or `Failed`
    ///
    /// Returns the last published status if the reporter is dropped first.
    pub async fn wait_for_terminal(&mut self) -> HarvestStatus {
        let reached = self
            .rx
            .wait_for(HarvestStatus::is_terminal)
            .await
            .map(|status| status.clone());
        match reached {
            Ok(status) => status,
            Err(_) => self.rx.borrow().clone(),
        }
    }
}

impl ProgressReporter for StatusReporter {
    fn report_initializing(&self) {
        self.publish(HarvestStatus::InProgress);
    }

    fn report_browser_launched(&self) {}

    fn report_page_rendered(&self, page_number: usize, url: &str, image_count: usize, settled: bool) {
        log::debug!(
            target: "imagegrab::progress",
            "Page {page_number} ({url}): {image_count} images{}",
            if settled { "" } else { " (render timed out)" }
        );
    }

    fn report_crawl_finished(&self, pages_visited: usize, references: usize) {
        log::debug!(
            target: "imagegrab::progress",
            "Crawl finished: {references} references over {pages_visited} pages"
        );
    }

    fn report_image_materialized(&self, _index: usize, _total: usize, _success: bool) {}

    fn report_archived(&self, _path: &Path, _entries: usize) {}

    fn report_completed(&self) {
        self.publish(HarvestStatus::Done);
    }

    fn report_error(&self, error: &str) {
        self.publish(HarvestStatus::Failed(error.to_string()));
    }
}
