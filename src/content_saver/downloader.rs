//! Image download functionality
//!
//! Fetches raw image bytes over HTTP with streaming, size limits and a
//! per-request timeout, and decodes inline `data:` URIs without touching the
//! network. Rate and concurrency control live in the materializer.

use anyhow::{Context, Result};
use base64::Engine;
use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;

use crate::utils::constants::CHROME_USER_AGENT;
use crate::utils::is_data_url;

/// Limits applied to a single image download
#[derive(Debug, Clone, Copy)]
pub struct DownloadLimits {
    pub timeout: Duration,
    /// Maximum accepted body size (bytes)
    pub max_bytes: usize,
}

/// Build the HTTP client shared by every download of one harvest
pub fn build_http_client() -> Result<Client> {
    Client::builder()
        .user_agent(CHROME_USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

/// Fetch the bytes behind an image locator
///
/// `data:` URIs are decoded in place; everything else goes through
/// [`download_image`].
pub async fn fetch_image_bytes(url: &str, client: &Client, limits: DownloadLimits) -> Result<Vec<u8>> {
    if is_data_url(url) {
        let bytes = decode_data_url(url)?;
        if bytes.len() > limits.max_bytes {
            return Err(anyhow::anyhow!(
                "Inline image too large: {} bytes exceeds limit of {} bytes",
                bytes.len(),
                limits.max_bytes
            ));
        }
        return Ok(bytes);
    }

    download_image(url, client, limits).await
}

/// Download an image over HTTP
///
/// Non-success status codes, transport failures, and bodies larger than
/// `limits.max_bytes` are all errors.
pub async fn download_image(url: &str, client: &Client, limits: DownloadLimits) -> Result<Vec<u8>> {
    // Download image with timeout and browser-like headers
    let response = client
        .get(url)
        .timeout(limits.timeout)
        .header("Accept", "image/avif,image/webp,image/apng,image/*,*/*;q=0.8")
        .send()
        .await
        .context("Failed to download image")?;

    // Check status
    if !response.status().is_success() {
        return Err(anyhow::anyhow!(
            "Image download failed with status: {}",
            response.status()
        ));
    }

    // Get expected size and enforce limit BEFORE downloading
    let expected_size = response.content_length().unwrap_or(0);
    if expected_size > limits.max_bytes as u64 {
        return Err(anyhow::anyhow!(
            "Image too large: {} bytes exceeds limit of {} bytes",
            expected_size,
            limits.max_bytes
        ));
    }

    // Pre-allocate buffer based on Content-Length
    let mut buffer = if expected_size > 0 {
        Vec::with_capacity(expected_size as usize)
    } else {
        Vec::new()
    };

    // Stream response with size checking (second line of defense)
    let mut stream = response.bytes_stream();
    let mut total_size = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.context("Failed to read image chunk")?;

        // Check BEFORE accumulating
        let new_total = total_size + chunk.len();
        if new_total > limits.max_bytes {
            return Err(anyhow::anyhow!(
                "Image download exceeded size limit during download: {} bytes (max: {})",
                new_total,
                limits.max_bytes
            ));
        }

        buffer.extend_from_slice(&chunk);
        total_size = new_total;
    }

    Ok(buffer)
}

/// Decode a `data:[<mediatype>][;base64],<data>` URI
pub fn decode_data_url(url: &str) -> Result<Vec<u8>> {
    let rest = url
        .get(5..)
        .filter(|_| is_data_url(url))
        .ok_or_else(|| anyhow::anyhow!("Not a data URL"))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| anyhow::anyhow!("Malformed data URL: missing ','"))?;

    let is_base64 = header
        .rsplit(';')
        .next()
        .is_some_and(|param| param.trim().eq_ignore_ascii_case("base64"));

    if is_base64 {
        // Markup often wraps long payloads; whitespace is not part of the data
        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact.as_bytes())
            .context("Invalid base64 payload in data URL")
    } else {
        Ok(urlencoding::decode_binary(payload.as_bytes()).into_owned())
    }
}
