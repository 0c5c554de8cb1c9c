//! Builder methods available for all states
//!
//! This module contains methods that can be called on the builder
//! regardless of its current type state.

use std::path::PathBuf;

use super::builder::HarvestConfigBuilder;
use crate::content_saver::OutputFormat;

impl<State> HarvestConfigBuilder<State> {
    /// Set browser headless mode (visible vs invisible browser window)
    ///
    /// Headless is the default. Headed mode needs a display server and is only
    /// honoured in debug builds; release builds force headless with a warning.
    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Write the archive somewhere other than `<output_dir>.zip`
    #[must_use]
    pub fn archive_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.archive_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn chrome_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.chrome_data_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn page_load_timeout_secs(mut self, secs: u64) -> Self {
        self.config.page_load_timeout_secs = secs;
        self
    }

    /// Bound on waiting for lazily loaded images to settle after scrolling
    #[must_use]
    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs;
        self
    }

    /// Bound on finding the "next page" control and on the navigation it triggers
    #[must_use]
    pub fn next_page_timeout_secs(mut self, secs: u64) -> Self {
        self.config.next_page_timeout_secs = secs;
        self
    }

    /// Cap the number of pages followed; `None` removes the cap
    ///
    /// # Example
    /// ```rust
    /// # use kodegen_tools_imagegrab::config::HarvestConfig;
    /// # fn main() -> anyhow::Result<()> {
    /// let config = HarvestConfig::builder()
    ///     .output_dir("./downloaded_images")
    ///     .start_url("https://example.com/gallery")
    ///     .max_pages(Some(5))
    ///     .build()?;
    /// assert_eq!(config.max_pages(), Some(5));
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    #[must_use]
    pub fn next_page_selector(mut self, selector: impl Into<String>) -> Self {
        self.config.next_page_selector = selector.into();
        self
    }

    #[must_use]
    pub fn image_selector(mut self, selector: impl Into<String>) -> Self {
        self.config.image_selector = selector.into();
        self
    }

    /// Attributes read, in order, for an image's URL
    #[must_use]
    pub fn locator_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.locator_attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn target_format(mut self, format: OutputFormat) -> Self {
        self.config.target_format = format;
        self
    }

    #[must_use]
    pub fn concurrency_limit(mut self, limit: usize) -> Self {
        self.config.concurrency_limit = limit;
        self
    }

    #[must_use]
    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn max_image_bytes(mut self, bytes: usize) -> Self {
        self.config.max_image_bytes = bytes;
        self
    }

    /// Enable exact resizing of every image to `width x height`
    #[must_use]
    pub fn resize(mut self, width: u32, height: u32) -> Self {
        self.config.resize = Some((width, height));
        self
    }

    #[must_use]
    pub fn keep_source_extension(mut self, keep: bool) -> Self {
        self.config.keep_source_extension = keep;
        self
    }
}
