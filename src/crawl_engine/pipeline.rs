//! End-to-end harvest: crawl, materialize, archive
//!
//! [`harvest`] launches a Chromium session for the configured start URL;
//! [`harvest_with_source`] runs the same pipeline over any [`PageSource`].

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::crawl_types::{CrawlError, ImageReference, Termination};
use super::paginator::Paginator;
use super::progress::ProgressReporter;
use crate::config::HarvestConfig;
use crate::content_saver::{ArchiveSummary, MaterializedFile, Materializer, archive};
use crate::page_source::{ChromiumPageSource, PageSource};
use crate::utils::normalize_start_url;

/// Everything one harvest produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResult {
    /// Discovery order, duplicates removed
    pub references: Vec<ImageReference>,
    /// One entry per reference, same order
    pub materialized: Vec<MaterializedFile>,
    /// `None` only when no references were found
    pub archive: Option<ArchiveSummary>,
    pub pages_visited: usize,
    pub timed_out_pages: usize,
    pub termination: Termination,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlResult {
    /// True when the crawl found no images at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    #[must_use]
    pub fn success_count(&self) -> usize {
        self.materialized.iter().filter(|f| f.is_success()).count()
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.materialized.len() - self.success_count()
    }
}

/// Harvest the configured start URL with a headless Chromium session
///
/// The browser is closed on every exit path once it has been launched.
pub async fn harvest<P>(
    config: &HarvestConfig,
    progress: &P,
    cancel: &CancellationToken,
) -> Result<CrawlResult, CrawlError>
where
    P: ProgressReporter + ?Sized,
{
    progress.report_initializing();

    let start_url = match normalize_start_url(config.start_url()) {
        Ok(url) => url,
        Err(e) => {
            let err = CrawlError::InvalidUrl(format!("{e:#}"));
            progress.report_error(&err.to_string());
            return Err(err);
        }
    };

    let launched = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(CrawlError::Cancelled),
        source = ChromiumPageSource::launch(config) => source,
    };
    let mut source = match launched {
        Ok(source) => source,
        Err(e) => {
            progress.report_error(&e.to_string());
            return Err(e);
        }
    };
    progress.report_browser_launched();

    harvest_from(config, &start_url, &mut source, progress, cancel).await
}

/// Run the pipeline over an already opened page source
///
/// The source is closed after pagination regardless of its outcome.
pub async fn harvest_with_source<S, P>(
    config: &HarvestConfig,
    source: &mut S,
    progress: &P,
    cancel: &CancellationToken,
) -> Result<CrawlResult, CrawlError>
where
    S: PageSource + Send,
    P: ProgressReporter + ?Sized,
{
    progress.report_initializing();

    let start_url = match normalize_start_url(config.start_url()) {
        Ok(url) => url,
        Err(e) => {
            // Never navigated, but the session is still owned here
            close_source(source).await;
            let err = CrawlError::InvalidUrl(format!("{e:#}"));
            progress.report_error(&err.to_string());
            return Err(err);
        }
    };

    harvest_from(config, &start_url, source, progress, cancel).await
}

async fn harvest_from<S, P>(
    config: &HarvestConfig,
    start_url: &str,
    source: &mut S,
    progress: &P,
    cancel: &CancellationToken,
) -> Result<CrawlResult, CrawlError>
where
    S: PageSource + Send,
    P: ProgressReporter + ?Sized,
{
    let result = run_stages(config, start_url, source, progress, cancel).await;
    match &result {
        Ok(_) => progress.report_completed(),
        Err(e) => progress.report_error(&e.to_string()),
    }
    result
}

async fn run_stages<S, P>(
    config: &HarvestConfig,
    start_url: &str,
    source: &mut S,
    progress: &P,
    cancel: &CancellationToken,
) -> Result<CrawlResult, CrawlError>
where
    S: PageSource + Send,
    P: ProgressReporter + ?Sized,
{
    let started_at = Utc::now();

    let crawled = match Paginator::from_config(config) {
        Ok(paginator) => {
            tokio::select! {
                biased;
                () = cancel.cancelled() => Err(CrawlError::Cancelled),
                outcome = paginator.crawl(source, start_url, progress) => outcome,
            }
        }
        Err(e) => Err(CrawlError::Config(format!("{e:#}"))),
    };
    close_source(source).await;
    let outcome = crawled?;

    if outcome.references.is_empty() {
        info!("No images found at {start_url}");
        return Ok(CrawlResult {
            references: Vec::new(),
            materialized: Vec::new(),
            archive: None,
            pages_visited: outcome.pages_visited,
            timed_out_pages: outcome.timed_out_pages,
            termination: outcome.termination,
            started_at,
            finished_at: Utc::now(),
        });
    }

    let materializer = Materializer::new(config.materialize_options())?;
    let materialized = materializer
        .materialize_with_progress(&outcome.references, cancel, progress)
        .await;
    if cancel.is_cancelled() {
        return Err(CrawlError::Cancelled);
    }

    let archive_path = config.archive_path();
    let summary = match archive(&materialized, &archive_path).await {
        Ok(summary) => summary,
        Err(source) => {
            warn!("Archiving failed; materialized files remain in {}", config.output_dir().display());
            return Err(CrawlError::Archive {
                source,
                materialized,
            });
        }
    };
    progress.report_archived(&summary.path, summary.entries.len());

    Ok(CrawlResult {
        references: outcome.references,
        materialized,
        archive: Some(summary),
        pages_visited: outcome.pages_visited,
        timed_out_pages: outcome.timed_out_pages,
        termination: outcome.termination,
        started_at,
        finished_at: Utc::now(),
    })
}

async fn close_source<S: PageSource + Send>(source: &mut S) {
    if let Err(e) = source.close().await {
        warn!("Failed to close page source: {e}");
    }
}
