//! URL and path manipulation utilities.
//!
//! This module provides functions for working with image URLs and the
//! on-disk layout of a harvest (working directory plus sibling archive).

use anyhow::Result;
use std::path::{Path, PathBuf};
use url::Url;

use super::constants::KNOWN_IMAGE_EXTENSIONS;

/// Check if a URL is valid
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    // Skip data URLs, javascript URLs, and other non-http schemes
    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match url::Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https")
        }
        Err(_) => false,
    }
}

/// Normalize a user-supplied start URL
///
/// Trims surrounding whitespace and lower-cases the whole string, then
/// requires an absolute `http`/`https` URL with a host.
pub fn normalize_start_url(raw: &str) -> Result<String> {
    let candidate = raw.trim().to_lowercase();
    if candidate.is_empty() {
        return Err(anyhow::anyhow!("URL is empty"));
    }

    let parsed =
        Url::parse(&candidate).map_err(|e| anyhow::anyhow!("Failed to parse URL '{candidate}': {e}"))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(anyhow::anyhow!(
            "Unsupported URL scheme '{}': only http and https are crawled",
            parsed.scheme()
        ));
    }
    if parsed.host_str().is_none() {
        return Err(anyhow::anyhow!("Invalid URL: no host"));
    }

    Ok(parsed.to_string())
}

/// Whether the locator is an inline `data:` URI
#[must_use]
pub fn is_data_url(url: &str) -> bool {
    url.get(..5).is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

/// Lower-cased extension of the URL path when it is a known image extension
///
/// Query strings and fragments are ignored, so
/// `https://cdn.test/a/photo.JPG?w=300` yields `Some("jpg")`.
#[must_use]
pub fn source_image_extension(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last_segment = parsed.path_segments()?.next_back()?;
    let decoded = urlencoding::decode(last_segment).ok()?;
    let ext = Path::new(decoded.as_ref())
        .extension()?
        .to_str()?
        .to_ascii_lowercase();

    KNOWN_IMAGE_EXTENSIONS
        .contains(&ext.as_str())
        .then_some(ext)
}

/// Archive path derived from the working directory: `<dir>.zip` next to it
pub fn archive_path_for(output_dir: &Path) -> Result<PathBuf> {
    let name = output_dir
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Output directory has no final component: {}", output_dir.display()))?
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid path encoding"))?;

    Ok(output_dir.with_file_name(format!("{name}.zip")))
}
