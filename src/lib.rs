//! Headless-browser image harvester.
//!
//! Renders a page in Chromium, follows its "next page" chain, collects every
//! image reference, downloads and normalizes the images concurrently and
//! packs them into a zip archive.

pub mod browser_setup;
pub mod config;
pub mod content_saver;
pub mod crawl_engine;
pub mod page_extractor;
pub mod page_source;
pub mod utils;

pub use browser_setup::{LaunchedBrowser, download_managed_browser, find_browser_executable, launch_browser};
pub use config::HarvestConfig;
pub use content_saver::{
    ArchiveDownload, ArchiveError, ArchiveSummary, MaterializeError, MaterializeOptions,
    MaterializedFile, Materializer, OutputFormat, archive, read_for_download,
};
pub use crawl_engine::{
    CrawlError, CrawlOutcome, CrawlResult, HarvestStatus, ImageReference, NoOpProgress, Paginator,
    ProgressReporter, StatusHandle, StatusReporter, Termination, harvest, harvest_with_source,
};
pub use page_extractor::{ImageExtractor, extract_images};
pub use page_source::{Advance, ChromiumPageSource, PageSource, PageState, SettleStatus};
