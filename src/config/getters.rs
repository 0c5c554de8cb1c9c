//! Getter methods for `HarvestConfig`
//!
//! This module provides all the accessor methods for retrieving configuration
//! values from a `HarvestConfig` instance.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::types::HarvestConfig;
use crate::content_saver::{MaterializeOptions, OutputFormat};
use crate::utils::archive_path_for;

impl HarvestConfig {
    #[must_use]
    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Resolved archive location
    ///
    /// Falls back to `<output_dir>.zip` when no explicit path was configured,
    /// and to `downloaded_images.zip` in the current directory when the output
    /// directory has no usable final component (e.g. `/`).
    #[must_use]
    pub fn archive_path(&self) -> PathBuf {
        self.archive_path.clone().unwrap_or_else(|| {
            archive_path_for(&self.output_dir).unwrap_or_else(|e| {
                log::warn!("Could not derive archive path from output dir: {e}");
                PathBuf::from(format!("{}.zip", crate::utils::DEFAULT_OUTPUT_DIR))
            })
        })
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn chrome_data_dir(&self) -> Option<&PathBuf> {
        self.chrome_data_dir.as_ref()
    }

    #[must_use]
    pub fn page_load_timeout_secs(&self) -> u64 {
        self.page_load_timeout_secs
    }

    #[must_use]
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    #[must_use]
    pub fn next_page_timeout(&self) -> Duration {
        Duration::from_secs(self.next_page_timeout_secs)
    }

    #[must_use]
    pub fn max_pages(&self) -> Option<usize> {
        self.max_pages
    }

    #[must_use]
    pub fn next_page_selector(&self) -> &str {
        &self.next_page_selector
    }

    #[must_use]
    pub fn image_selector(&self) -> &str {
        &self.image_selector
    }

    #[must_use]
    pub fn locator_attributes(&self) -> &[String] {
        &self.locator_attributes
    }

    #[must_use]
    pub fn target_format(&self) -> OutputFormat {
        self.target_format
    }

    #[must_use]
    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    #[must_use]
    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes
    }

    #[must_use]
    pub fn resize(&self) -> Option<(u32, u32)> {
        self.resize
    }

    #[must_use]
    pub fn keep_source_extension(&self) -> bool {
        self.keep_source_extension
    }

    /// Options for the materialization stage derived from this config
    #[must_use]
    pub fn materialize_options(&self) -> MaterializeOptions {
        MaterializeOptions {
            output_dir: self.output_dir.clone(),
            target_format: self.target_format,
            concurrency_limit: self.concurrency_limit,
            fetch_timeout: self.fetch_timeout(),
            max_image_bytes: self.max_image_bytes,
            resize: self.resize,
            keep_source_extension: self.keep_source_extension,
        }
    }
}
