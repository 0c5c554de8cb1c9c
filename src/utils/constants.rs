//! Shared configuration constants for imagegrab
//!
//! This module contains default values and configuration constants used
//! throughout the codebase to ensure consistency and avoid magic numbers.

/// Default bound on how long a freshly loaded page may take to settle
///
/// After scrolling to the end of the document the renderer polls until the
/// set of `<img>` elements stops changing. Galleries that never settle are
/// processed as-is once this elapses.
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 5;

/// Default bound for locating the "next page" control and for the
/// navigation that follows clicking it
pub const DEFAULT_NEXT_PAGE_TIMEOUT_SECS: u64 = 10;

/// Default timeout for `page.goto()` on the start URL
pub const DEFAULT_PAGE_LOAD_TIMEOUT_SECS: u64 = 30;

/// Default cap on the number of pages followed in one crawl
///
/// Guards against sites whose "next" control never disappears.
pub const DEFAULT_MAX_PAGES: usize = 50;

/// Default CSS selector of the "next page" affordance
pub const DEFAULT_NEXT_PAGE_SELECTOR: &str = "span.next > a";

/// Default CSS selector of image-bearing elements
pub const DEFAULT_IMAGE_SELECTOR: &str = "img";

/// Attributes consulted, in order, for an image's resource locator
///
/// `src` first; the rest are common lazy-loading conventions that hold the
/// real URL until a script swaps it in.
pub const DEFAULT_LOCATOR_ATTRIBUTES: &[&str] = &["src", "data-src", "data-lazy-src", "data-original"];

/// Attribute holding an image's descriptive text
pub const CAPTION_ATTRIBUTE: &str = "alt";

/// Default number of images fetched and converted at the same time
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 8;

/// Default per-image HTTP timeout
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

/// Largest image body accepted from the network (bytes)
///
/// Typical gallery images: 100KB-5MB, large originals: 10-20MB.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 32 * 1024 * 1024;

/// Default working directory for materialized images
pub const DEFAULT_OUTPUT_DIR: &str = "downloaded_images";

/// Prefix of every materialized file name (`image_1.png`, `image_2.jpg`, ...)
pub const MATERIALIZED_FILE_PREFIX: &str = "image_";

/// Source extensions kept on materialized file names
pub const KNOWN_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "jfif", "webp"];

/// Media type of the packaged archive
pub const ARCHIVE_MIME_TYPE: &str = "application/zip";

/// Poll interval used while waiting for dynamic content
pub const POLL_INTERVAL_MS: u64 = 100;

/// Chrome user agent string for stealth mode
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
/// Next update: 2025-04-29 (quarterly schedule)
///
/// Reference: https://chromiumdash.appspot.com/schedule
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
