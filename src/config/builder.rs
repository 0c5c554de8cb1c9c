//! Type-safe builder for `HarvestConfig` using the typestate pattern
//!
//! This module provides a fluent builder interface with compile-time validation
//! ensuring that the output directory and start URL are set before building.

use anyhow::{Result, anyhow};
use scraper::Selector;
use std::marker::PhantomData;
use std::path::PathBuf;

use super::types::HarvestConfig;
use crate::utils::normalize_start_url;

/// Highest accepted `concurrency_limit`
const MAX_CONCURRENCY_LIMIT: usize = 64;

// Type states for the builder
pub struct WithOutputDir;
pub struct WithStartUrl;

pub struct HarvestConfigBuilder<State = ()> {
    pub(crate) config: HarvestConfig,
    pub(crate) start_url_error: Option<String>,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for HarvestConfigBuilder<()> {
    fn default() -> Self {
        Self {
            config: HarvestConfig::default(),
            start_url_error: None,
            _phantom: PhantomData,
        }
    }
}

impl HarvestConfig {
    /// Create a builder for configuring a `HarvestConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> HarvestConfigBuilder<()> {
        HarvestConfigBuilder::default()
    }
}

impl<State> HarvestConfigBuilder<State> {
    fn transition<Next>(self) -> HarvestConfigBuilder<Next> {
        HarvestConfigBuilder {
            config: self.config,
            start_url_error: self.start_url_error,
            _phantom: PhantomData,
        }
    }
}

impl HarvestConfigBuilder<()> {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> HarvestConfigBuilder<WithOutputDir> {
        self.config.output_dir = dir.into();
        self.transition()
    }
}

impl HarvestConfigBuilder<WithOutputDir> {
    /// Set the start URL
    ///
    /// The URL is trimmed and lower-cased. Anything that is not an absolute
    /// `http`/`https` URL is reported by `build()`.
    pub fn start_url(mut self, url: impl Into<String>) -> HarvestConfigBuilder<WithStartUrl> {
        let raw = url.into();
        match normalize_start_url(&raw) {
            Ok(normalized) => self.config.start_url = normalized,
            Err(e) => {
                self.config.start_url = raw;
                self.start_url_error = Some(format!("{e:#}"));
            }
        }
        self.transition()
    }
}

// Build method only available when all required fields are set
impl HarvestConfigBuilder<WithStartUrl> {
    pub fn build(self) -> Result<HarvestConfig> {
        if let Some(err) = self.start_url_error {
            return Err(anyhow!("Invalid start_url: {err}"));
        }

        let config = self.config;

        if config.output_dir.as_os_str().is_empty() {
            return Err(anyhow!("output_dir must not be empty"));
        }
        if config.concurrency_limit == 0 || config.concurrency_limit > MAX_CONCURRENCY_LIMIT {
            return Err(anyhow!(
                "concurrency_limit must be between 1 and {MAX_CONCURRENCY_LIMIT}, got {}",
                config.concurrency_limit
            ));
        }
        if config.max_pages == Some(0) {
            return Err(anyhow!("max_pages must be at least 1"));
        }
        if let Some((width, height)) = config.resize
            && (width == 0 || height == 0)
        {
            return Err(anyhow!("resize dimensions must be non-zero, got {width}x{height}"));
        }
        if config.locator_attributes.iter().all(|a| a.trim().is_empty()) {
            return Err(anyhow!("at least one locator attribute is required"));
        }
        if config.render_timeout_secs == 0 || config.next_page_timeout_secs == 0 {
            return Err(anyhow!("render and next-page timeouts must be at least 1 second"));
        }

        // Surface selector typos here instead of on the first page
        for (name, selector) in [
            ("next_page_selector", &config.next_page_selector),
            ("image_selector", &config.image_selector),
        ] {
            Selector::parse(selector)
                .map_err(|e| anyhow!("Invalid {name} '{selector}': {e}"))?;
        }

        // Enforce headless mode in release builds for production safety
        #[cfg(not(debug_assertions))]
        let config = if !config.headless {
            tracing::warn!(
                "Forcing headless mode in release build. \
                Headed mode is only available in debug builds for development."
            );
            HarvestConfig {
                headless: true,
                ..config
            }
        } else {
            config
        };

        Ok(config)
    }
}
