//! Browser and resource cleanup functionality
//!
//! Releases a crawl's browser session: the Chromium process, the CDP handler
//! task, and the per-session profile directory.

use chromiumoxide::Browser;
use log::{debug, warn};
use std::path::PathBuf;
use tokio::task::JoinHandle;

/// Result of cleanup operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupResult {
    /// All cleanup operations succeeded
    Success,
    /// Some cleanup operations failed, with error details
    PartialFailure(Vec<String>),
}

/// Close the browser, stop its handler task and remove the profile directory
///
/// Every step is attempted even when an earlier one fails.
pub async fn cleanup_browser_and_data(
    mut browser: Browser,
    handler: Option<JoinHandle<()>>,
    chrome_data_dir: Option<PathBuf>,
) -> CleanupResult {
    let mut errors = Vec::new();

    debug!(target: "imagegrab::cleanup", "Closing browser");
    if let Err(e) = browser.close().await {
        warn!(target: "imagegrab::cleanup", "Failed to close browser: {e}");
        errors.push(format!("Browser close failed: {e}"));
    }

    // Wait for browser process to fully exit (prevents "not closed manually" warning)
    if let Err(e) = browser.wait().await {
        warn!(target: "imagegrab::cleanup", "Failed to wait for browser exit: {e}");
        errors.push(format!("Browser wait failed: {e}"));
    } else {
        debug!(target: "imagegrab::cleanup", "Browser process exited");
    }

    if let Some(handler) = handler {
        handler.abort();
        if let Err(e) = handler.await
            && !e.is_cancelled()
        {
            warn!(target: "imagegrab::cleanup", "Browser handler task failed: {e}");
            errors.push(format!("Handler task failed: {e}"));
        }
    }

    if let Some(dir) = chrome_data_dir {
        debug!(target: "imagegrab::cleanup", "Removing Chrome data directory {}", dir.display());
        if let Err(e) = tokio::fs::remove_dir_all(&dir).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(target: "imagegrab::cleanup", "Failed to clean up Chrome data directory: {e}");
            errors.push(format!("Directory cleanup failed: {e}"));
        }
    }

    if errors.is_empty() {
        CleanupResult::Success
    } else {
        CleanupResult::PartialFailure(errors)
    }
}
