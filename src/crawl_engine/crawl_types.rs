//! Core types for crawling operations.
//!
//! This module contains the error taxonomy of a harvest, the discovered
//! [`ImageReference`], and the outcome of walking a paginated chain.

use serde::{Deserialize, Serialize};

use crate::content_saver::{ArchiveError, MaterializedFile};

/// An image found on a rendered page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageReference {
    /// Absolute URL (relative locators are resolved against the page URL)
    pub url: String,
    /// Descriptive text from the element's `alt` attribute, if any
    pub caption: Option<String>,
}

impl ImageReference {
    #[must_use]
    pub fn new(url: impl Into<String>, caption: Option<String>) -> Self {
        Self {
            url: url.into(),
            caption,
        }
    }
}

/// Custom error type for crawl operations
///
/// Only the variants here are hard failures. A page that does not settle in
/// time, a missing "next" control, and per-image failures are all reported
/// as values instead.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CrawlError {
    /// Start URL rejected before any work started
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Browser could not be launched or driven
    #[error("Browser error: {0}")]
    Browser(String),

    /// The browsing session failed mid-crawl
    ///
    /// `partial` holds the references gathered before the failure; whether
    /// to use them is the caller's decision.
    #[error("Crawl failed after collecting {} references: {message}", partial.len())]
    CrawlFailed {
        message: String,
        partial: Vec<ImageReference>,
    },

    /// Packaging failed; the materialized files are still on disk
    #[error("{source}")]
    Archive {
        #[source]
        source: ArchiveError,
        materialized: Vec<MaterializedFile>,
    },

    /// Operation cancelled
    #[error("Crawl operation was cancelled")]
    Cancelled,

    /// Other errors
    #[error("Crawl error: {0}")]
    Other(String),
}

impl From<anyhow::Error> for CrawlError {
    fn from(err: anyhow::Error) -> Self {
        // Use {:#} to preserve full error chain with context
        Self::Other(format!("{err:#}"))
    }
}

/// Why the paginator stopped following pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// The last page had no "next" control
    NoNextPage,
    /// The configured page cap was hit while a further page existed
    PageLimitReached,
    /// Activating "next" left the same document in place
    Stalled,
}

/// Result of walking a paginated chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlOutcome {
    /// All references in discovery order, first occurrence of each URL kept
    pub references: Vec<ImageReference>,
    pub pages_visited: usize,
    /// Pages whose images had not settled when the render timeout expired
    pub timed_out_pages: usize,
    pub termination: Termination,
}
