//! Sequential walk over a paginated chain of rendered pages
//!
//! Renders the start page, extracts its images, then keeps activating the
//! "next" control until there is none, the page cap is hit, or the chain
//! stops moving. One [`PageSource`] session is used for the whole walk and is
//! never closed here; its owner closes it.

use log::{debug, info, warn};
use std::collections::HashSet;

use super::crawl_types::{CrawlError, CrawlOutcome, ImageReference, Termination};
use super::progress::ProgressReporter;
use crate::config::HarvestConfig;
use crate::page_extractor::ImageExtractor;
use crate::page_source::{Advance, PageSource, PageState, SettleStatus};

/// Follows "next" links and accumulates image references
#[derive(Debug, Clone)]
pub struct Paginator {
    extractor: ImageExtractor,
    /// `None` means unbounded
    max_pages: Option<usize>,
}

/// References gathered so far, first occurrence of each URL kept
#[derive(Debug, Default)]
struct Accumulator {
    references: Vec<ImageReference>,
    seen: HashSet<String>,
}

impl Accumulator {
    /// Append a page's references; returns how many were new
    fn extend(&mut self, found: Vec<ImageReference>) -> usize {
        let before = self.references.len();
        for reference in found {
            if self.seen.insert(reference.url.clone()) {
                self.references.push(reference);
            }
        }
        self.references.len() - before
    }
}

impl Paginator {
    #[must_use]
    pub fn new(extractor: ImageExtractor, max_pages: Option<usize>) -> Self {
        Self {
            extractor,
            max_pages,
        }
    }

    pub fn from_config(config: &HarvestConfig) -> anyhow::Result<Self> {
        let extractor = ImageExtractor::new(config.image_selector(), config.locator_attributes())?;
        Ok(Self::new(extractor, config.max_pages()))
    }

    #[must_use]
    pub fn max_pages(&self) -> Option<usize> {
        self.max_pages
    }

    /// Walk the chain starting at `start_url`
    ///
    /// At the page cap the source is still advanced once so that a chain
    /// ending exactly at the cap reports [`Termination::NoNextPage`]; the
    /// page reached by that advance is not extracted.
    ///
    /// Errors from the source abort the walk with [`CrawlError::CrawlFailed`]
    /// carrying every reference gathered before the failure.
    pub async fn crawl<S, P>(
        &self,
        source: &mut S,
        start_url: &str,
        progress: &P,
    ) -> Result<CrawlOutcome, CrawlError>
    where
        S: PageSource + Send,
        P: ProgressReporter + ?Sized,
    {
        let mut acc = Accumulator::default();
        let mut pages_visited = 0usize;
        let mut timed_out_pages = 0usize;

        let mut state = source
            .render(start_url)
            .await
            .map_err(|e| crawl_failed(&e, &acc))?;

        let termination = loop {
            pages_visited += 1;
            if state.settle == SettleStatus::TimedOut {
                timed_out_pages += 1;
            }

            let found = self.extractor.extract_page(&state);
            let found_count = found.len();
            let added = acc.extend(found);
            debug!(
                "Page {pages_visited} ({}): {found_count} images, {added} new",
                state.url
            );
            progress.report_page_rendered(
                pages_visited,
                &state.url,
                found_count,
                state.settle == SettleStatus::Settled,
            );

            match source
                .advance(&state)
                .await
                .map_err(|e| crawl_failed(&e, &acc))?
            {
                Advance::NotFound => break Termination::NoNextPage,
                // The cap only applies when there is somewhere left to go
                Advance::Next(_) if self.max_pages.is_some_and(|max| pages_visited >= max) => {
                    info!("Page limit of {pages_visited} reached at {}", state.url);
                    break Termination::PageLimitReached;
                }
                Advance::Next(next) => {
                    if is_stalled(&state, &next) {
                        warn!(
                            "Next page control on {} did not change the page; stopping",
                            state.url
                        );
                        break Termination::Stalled;
                    }
                    state = next;
                }
            }
        };

        info!(
            "Crawl finished after {pages_visited} pages with {} images ({termination:?})",
            acc.references.len()
        );
        progress.report_crawl_finished(pages_visited, acc.references.len());

        Ok(CrawlOutcome {
            references: acc.references,
            pages_visited,
            timed_out_pages,
            termination,
        })
    }
}

fn is_stalled(previous: &PageState, next: &PageState) -> bool {
    previous.url == next.url && previous.fingerprint() == next.fingerprint()
}

fn crawl_failed(error: &CrawlError, acc: &Accumulator) -> CrawlError {
    warn!(
        "Crawl aborted with {} references collected: {error}",
        acc.references.len()
    );
    CrawlError::CrawlFailed {
        message: error.to_string(),
        partial: acc.references.clone(),
    }
}
