//! Crawl Engine Module
//!
//! Pagination over a rendered page chain, the end-to-end harvest pipeline,
//! and the timing, cleanup and progress plumbing they share.

// Sub-modules
pub mod cleanup;
pub mod crawl_types;
pub mod page_timeout;
pub mod paginator;
pub mod pipeline;
pub mod progress;

// Re-exports for public API
pub use crawl_types::{CrawlError, CrawlOutcome, ImageReference, Termination};
pub use page_timeout::{PollResult, poll_until, with_page_timeout};
pub use paginator::Paginator;
pub use pipeline::{CrawlResult, harvest, harvest_with_source};
pub use progress::{HarvestStatus, NoOpProgress, ProgressReporter, StatusHandle, StatusReporter};
