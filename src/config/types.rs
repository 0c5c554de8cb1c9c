//! Core configuration types for image harvesting
//!
//! This module contains the main `HarvestConfig` struct that defines the
//! parameters for one crawl-and-materialize run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::content_saver::OutputFormat;
use crate::utils::{
    DEFAULT_CONCURRENCY_LIMIT, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_IMAGE_SELECTOR,
    DEFAULT_LOCATOR_ATTRIBUTES, DEFAULT_MAX_IMAGE_BYTES, DEFAULT_MAX_PAGES,
    DEFAULT_NEXT_PAGE_SELECTOR, DEFAULT_NEXT_PAGE_TIMEOUT_SECS, DEFAULT_OUTPUT_DIR,
    DEFAULT_PAGE_LOAD_TIMEOUT_SECS, DEFAULT_RENDER_TIMEOUT_SECS,
};

/// Main configuration struct for a harvest run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Normalized start URL (trimmed, lower-cased, absolute http/https)
    pub(crate) start_url: String,

    /// Working directory that receives one file per materialized image
    pub(crate) output_dir: PathBuf,

    /// Explicit archive location. When `None` the archive is written next to
    /// `output_dir` as `<output_dir>.zip`.
    pub(crate) archive_path: Option<PathBuf>,

    pub(crate) headless: bool,

    /// Chrome user data directory for this crawl's browser session.
    /// When unset a unique directory under the system temp dir is used.
    /// Either way the directory is removed when the session closes.
    #[serde(skip)]
    pub(crate) chrome_data_dir: Option<PathBuf>,

    /// Timeout in seconds for `page.goto()` on the start URL
    ///
    /// Default: 30 seconds
    pub(crate) page_load_timeout_secs: u64,

    /// How long a rendered page may take to report a stable set of images
    ///
    /// Expiry is not fatal: the document is processed as it stands.
    ///
    /// Default: 5 seconds
    pub(crate) render_timeout_secs: u64,

    /// How long to look for the "next page" control, and how long to wait for
    /// the navigation triggered by clicking it
    ///
    /// Default: 10 seconds
    pub(crate) next_page_timeout_secs: u64,

    /// Upper bound on pages followed. `None` follows the chain until the
    /// "next" control disappears.
    ///
    /// Default: 50
    pub(crate) max_pages: Option<usize>,

    pub(crate) next_page_selector: String,
    pub(crate) image_selector: String,
    pub(crate) locator_attributes: Vec<String>,

    /// Canonical encoding every image is normalized to
    pub(crate) target_format: OutputFormat,

    /// Maximum fetch+decode+encode operations in flight
    /// Default: 8, Range: 1-64
    pub(crate) concurrency_limit: usize,

    pub(crate) fetch_timeout_secs: u64,
    pub(crate) max_image_bytes: usize,

    /// Optional exact resize `(width, height)`. Disabled by default; when set
    /// every image is scaled to exactly these dimensions (aspect ratio is not
    /// preserved).
    pub(crate) resize: Option<(u32, u32)>,

    /// Keep a recognized source extension (`.jpg`, `.webp`, ...) on the
    /// materialized file name instead of the target format's extension
    pub(crate) keep_source_extension: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            start_url: String::new(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            archive_path: None,
            headless: true,
            chrome_data_dir: None,
            page_load_timeout_secs: DEFAULT_PAGE_LOAD_TIMEOUT_SECS,
            render_timeout_secs: DEFAULT_RENDER_TIMEOUT_SECS,
            next_page_timeout_secs: DEFAULT_NEXT_PAGE_TIMEOUT_SECS,
            max_pages: Some(DEFAULT_MAX_PAGES),
            next_page_selector: DEFAULT_NEXT_PAGE_SELECTOR.to_string(),
            image_selector: DEFAULT_IMAGE_SELECTOR.to_string(),
            locator_attributes: DEFAULT_LOCATOR_ATTRIBUTES
                .iter()
                .map(|attr| (*attr).to_string())
                .collect(),
            target_format: OutputFormat::default(),
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            resize: None,
            keep_source_extension: true,
        }
    }
}
