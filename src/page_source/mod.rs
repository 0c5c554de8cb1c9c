//! Rendered page sources.
//!
//! A [`PageSource`] owns one browsing session and exposes the three
//! operations pagination needs: render a URL, advance to the next page, and
//! close. [`ChromiumPageSource`] drives a headless Chromium over CDP; tests
//! substitute canned implementations.

pub mod chromium;
pub mod js_scripts;

use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::crawl_engine::crawl_types::CrawlError;

pub use chromium::ChromiumPageSource;

/// Whether a page's image set stabilized before the render timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettleStatus {
    Settled,
    /// The wait expired; the document is whatever had rendered by then
    TimedOut,
}

/// Locator of the "next page" affordance found on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextPageControl {
    pub selector: String,
    /// Target of the control, when it is a link with an `href`
    pub href: Option<String>,
}

/// A fully rendered page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageState {
    /// URL the document was rendered from; base for relative image locators
    pub url: String,
    /// Serialized DOM after client-side scripts ran
    pub html: String,
    pub next_page: Option<NextPageControl>,
    pub settle: SettleStatus,
}

impl PageState {
    /// Fingerprint of the rendered document used to detect pagination that
    /// does not change the page
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        xxhash_rust::xxh3::xxh3_64(self.html.as_bytes())
    }
}

/// Result of trying to move to the next page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Next(PageState),
    /// No "next" control within the timeout: the normal end of a chain
    NotFound,
}

/// One browsing session, driven strictly sequentially
///
/// Errors returned from `render` or `advance` are fatal to the crawl. Slow
/// pages are not errors: they come back with [`SettleStatus::TimedOut`].
pub trait PageSource {
    /// Load `url`, force lazy content to materialize, and return the rendered page
    fn render(&mut self, url: &str) -> impl Future<Output = Result<PageState, CrawlError>> + Send;

    /// Activate the current page's "next" control and return the resulting page
    fn advance(
        &mut self,
        current: &PageState,
    ) -> impl Future<Output = Result<Advance, CrawlError>> + Send;

    /// Release the session; called once on every exit path
    fn close(&mut self) -> impl Future<Output = Result<(), CrawlError>> + Send;
}

/// One readiness observation of the live document
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    pub ready_state: String,
    pub image_count: usize,
}

/// Decides when the set of image-bearing elements has stopped changing
///
/// A snapshot is accepted once the document is `complete`, holds at least one
/// image, and the image count equals the count of the previous observation.
#[derive(Debug, Default)]
pub struct ImageSettleTracker {
    last_count: Option<usize>,
}

impl ImageSettleTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, snapshot: &DocumentSnapshot) -> bool {
        let settled = snapshot.ready_state == "complete"
            && snapshot.image_count > 0
            && self.last_count == Some(snapshot.image_count);
        self.last_count = Some(snapshot.image_count);
        settled
    }
}
