//! Concurrent image materialization
//!
//! Turns the ordered list of discovered [`ImageReference`]s into files on
//! disk: fetch, decode, normalize to the canonical format, write. Each
//! reference is processed independently; a failure is recorded on its own
//! [`MaterializedFile`] and never aborts the batch.

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use super::downloader::{DownloadLimits, build_http_client, fetch_image_bytes};
use super::image_convert::{ConvertError, OutputFormat, normalize_image};
use crate::crawl_engine::crawl_types::ImageReference;
use crate::crawl_engine::progress::{NoOpProgress, ProgressReporter};
use crate::utils::{MATERIALIZED_FILE_PREFIX, is_data_url, is_valid_url, source_image_extension};

/// Settings for one materialization batch
#[derive(Debug, Clone)]
pub struct MaterializeOptions {
    /// Directory receiving `image_N.ext` files; created if missing
    pub output_dir: PathBuf,
    pub target_format: OutputFormat,
    /// Maximum fetch+decode+encode operations in flight (values below 1 are treated as 1)
    pub concurrency_limit: usize,
    pub fetch_timeout: Duration,
    pub max_image_bytes: usize,
    /// Exact `(width, height)` resize; `None` keeps original dimensions
    pub resize: Option<(u32, u32)>,
    pub keep_source_extension: bool,
}

/// Per-resource failure recorded on a [`MaterializedFile`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum MaterializeError {
    /// Network failure, non-success status, or oversized body
    #[error("Fetch failed: {0}")]
    FetchFailed(String),
    #[error("Decode failed: {0}")]
    DecodeFailed(String),
    #[error("Encode failed: {0}")]
    EncodeFailed(String),
    #[error("Write failed: {0}")]
    WriteFailed(String),
    #[error("Cancelled before completion")]
    Cancelled,
}

impl From<ConvertError> for MaterializeError {
    fn from(err: ConvertError) -> Self {
        match err {
            ConvertError::Decode(msg) => Self::DecodeFailed(msg),
            ConvertError::Encode(msg) => Self::EncodeFailed(msg),
        }
    }
}

/// Outcome of materializing one reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializedFile {
    /// Position of the reference in the input sequence
    pub index: usize,
    pub reference: ImageReference,
    /// Set only on success
    pub local_path: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub size_bytes: u64,
    pub error: Option<MaterializeError>,
}

impl MaterializedFile {
    fn failed(index: usize, reference: ImageReference, error: MaterializeError) -> Self {
        Self {
            index,
            reference,
            local_path: None,
            format: None,
            size_bytes: 0,
            error: Some(error),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.local_path.is_some()
    }
}

/// Deterministic file name for the reference at `index`
///
/// `image_{index + 1}` plus the source URL's extension when it is a known
/// image extension (and `keep_source_extension` is set), otherwise the
/// target format's extension.
#[must_use]
pub fn materialized_file_name(
    index: usize,
    url: &str,
    format: OutputFormat,
    keep_source_extension: bool,
) -> String {
    let ext = keep_source_extension
        .then(|| source_image_extension(url))
        .flatten()
        .unwrap_or_else(|| format.extension().to_string());

    format!("{MATERIALIZED_FILE_PREFIX}{}.{ext}", index + 1)
}

/// Downloads and normalizes image references with bounded concurrency
#[derive(Debug, Clone)]
pub struct Materializer {
    options: MaterializeOptions,
    client: Client,
}

impl Materializer {
    pub fn new(options: MaterializeOptions) -> anyhow::Result<Self> {
        Ok(Self::with_client(options, build_http_client()?))
    }

    #[must_use]
    pub fn with_client(options: MaterializeOptions, client: Client) -> Self {
        Self { options, client }
    }

    #[must_use]
    pub fn options(&self) -> &MaterializeOptions {
        &self.options
    }

    /// Materialize every reference; see [`Materializer::materialize_with_cancel`]
    pub async fn materialize(&self, references: &[ImageReference]) -> Vec<MaterializedFile> {
        self.materialize_with_cancel(references, &CancellationToken::new())
            .await
    }

    /// Materialize every reference, returning one entry per input in input order
    ///
    /// Completion order is unconstrained; each finished entry lands in the
    /// slot reserved for its input position. References not yet started when
    /// `cancel` fires are recorded as [`MaterializeError::Cancelled`].
    pub async fn materialize_with_cancel(
        &self,
        references: &[ImageReference],
        cancel: &CancellationToken,
    ) -> Vec<MaterializedFile> {
        self.materialize_with_progress(references, cancel, &NoOpProgress)
            .await
    }

    /// Like [`Materializer::materialize_with_cancel`], reporting each finished
    /// reference as it completes
    pub async fn materialize_with_progress<P>(
        &self,
        references: &[ImageReference],
        cancel: &CancellationToken,
        progress: &P,
    ) -> Vec<MaterializedFile>
    where
        P: ProgressReporter + ?Sized,
    {
        let start = Instant::now();
        let limit = self.options.concurrency_limit.max(1);

        if let Err(e) = tokio::fs::create_dir_all(&self.options.output_dir).await {
            warn!(
                "Failed to create output directory {}: {e}",
                self.options.output_dir.display()
            );
            let msg = format!("cannot create {}: {e}", self.options.output_dir.display());
            return references
                .iter()
                .enumerate()
                .map(|(index, reference)| {
                    MaterializedFile::failed(index, reference.clone(), MaterializeError::WriteFailed(msg.clone()))
                })
                .collect();
        }

        info!(
            "Materializing {} images into {} ({} at a time, format {})",
            references.len(),
            self.options.output_dir.display(),
            limit,
            self.options.target_format
        );

        let semaphore = Arc::new(Semaphore::new(limit));
        let mut in_flight = FuturesUnordered::new();
        for (index, reference) in references.iter().enumerate() {
            in_flight.push(self.materialize_one(
                index,
                reference.clone(),
                Arc::clone(&semaphore),
                cancel.clone(),
            ));
        }

        let mut slots: Vec<Option<MaterializedFile>> = (0..references.len()).map(|_| None).collect();
        let total = references.len();
        while let Some(file) = in_flight.next().await {
            let index = file.index;
            progress.report_image_materialized(index, total, file.is_success());
            slots[index] = Some(file);
        }

        let files: Vec<MaterializedFile> = slots
            .into_iter()
            .zip(references.iter())
            .enumerate()
            .map(|(index, (slot, reference))| {
                slot.unwrap_or_else(|| {
                    MaterializedFile::failed(index, reference.clone(), MaterializeError::Cancelled)
                })
            })
            .collect();

        let successes = files.iter().filter(|f| f.is_success()).count();
        info!(
            "Materialized {successes}/{} images in {:.2}s",
            files.len(),
            start.elapsed().as_secs_f64()
        );

        files
    }

    async fn materialize_one(
        &self,
        index: usize,
        reference: ImageReference,
        semaphore: Arc<Semaphore>,
        cancel: CancellationToken,
    ) -> MaterializedFile {
        let _permit = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return MaterializedFile::failed(index, reference, MaterializeError::Cancelled);
            }
            permit = semaphore.acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return MaterializedFile::failed(index, reference, MaterializeError::Cancelled),
            },
        };

        if !is_data_url(&reference.url) && !is_valid_url(&reference.url) {
            let msg = format!("unsupported locator '{}'", reference.url);
            return MaterializedFile::failed(index, reference, MaterializeError::FetchFailed(msg));
        }

        let limits = DownloadLimits {
            timeout: self.options.fetch_timeout,
            max_bytes: self.options.max_image_bytes,
        };

        let fetched = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return MaterializedFile::failed(index, reference, MaterializeError::Cancelled);
            }
            fetched = fetch_image_bytes(&reference.url, &self.client, limits) => fetched,
        };

        let bytes = match fetched {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to fetch image #{} from {}: {e:#}", index + 1, reference.url);
                return MaterializedFile::failed(
                    index,
                    reference,
                    MaterializeError::FetchFailed(format!("{e:#}")),
                );
            }
        };

        let file_name = materialized_file_name(
            index,
            &reference.url,
            self.options.target_format,
            self.options.keep_source_extension,
        );
        let target = self.options.output_dir.join(&file_name);
        let format = self.options.target_format;
        let resize = self.options.resize;
        let output_dir = self.options.output_dir.clone();

        // Decode/encode is CPU bound and the write is blocking I/O
        let blocking = tokio::task::spawn_blocking(move || -> Result<(PathBuf, u64), MaterializeError> {
            let normalized = normalize_image(&bytes, format, resize)?;
            write_atomically(&output_dir, &target, &normalized.bytes)?;
            Ok((target, normalized.bytes.len() as u64))
        })
        .await;

        match blocking {
            Ok(Ok((path, size_bytes))) => {
                debug!(
                    "Saved image #{} ({} bytes) from {} to {}",
                    index + 1,
                    size_bytes,
                    reference.url,
                    path.display()
                );
                MaterializedFile {
                    index,
                    reference,
                    local_path: Some(path),
                    format: Some(format),
                    size_bytes,
                    error: None,
                }
            }
            Ok(Err(error)) => {
                warn!("Failed to materialize image #{} from {}: {error}", index + 1, reference.url);
                MaterializedFile::failed(index, reference, error)
            }
            Err(join_error) => MaterializedFile::failed(
                index,
                reference,
                MaterializeError::EncodeFailed(format!("conversion task failed: {join_error}")),
            ),
        }
    }
}

/// Write through a temp file in the same directory, then rename into place
///
/// A task abandoned mid-write leaves only an unnamed temp file behind, never a
/// truncated `image_N` file.
fn write_atomically(dir: &Path, target: &Path, bytes: &[u8]) -> Result<(), MaterializeError> {
    let write_err = |e: std::io::Error| MaterializeError::WriteFailed(format!("{}: {e}", target.display()));

    let mut temp_file = NamedTempFile::new_in(dir).map_err(write_err)?;
    temp_file.write_all(bytes).map_err(write_err)?;
    temp_file.flush().map_err(write_err)?;
    temp_file
        .persist(target)
        .map_err(|e| write_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_keeps_known_source_extension() {
        let name = materialized_file_name(0, "https://cdn.test/a/cat.JPEG?x=1", OutputFormat::Png, true);
        assert_eq!(name, "image_1.jpeg");
    }

    #[test]
    fn test_file_name_falls_back_to_canonical_extension() {
        let name = materialized_file_name(4, "https://cdn.test/render.php?id=9", OutputFormat::Png, true);
        assert_eq!(name, "image_5.png");

        let forced = materialized_file_name(1, "https://cdn.test/cat.webp", OutputFormat::Jpeg, false);
        assert_eq!(forced, "image_2.jpg");
    }

    #[test]
    fn test_convert_error_mapping() {
        assert!(matches!(
            MaterializeError::from(ConvertError::Decode("x".into())),
            MaterializeError::DecodeFailed(_)
        ));
        assert!(matches!(
            MaterializeError::from(ConvertError::Encode("x".into())),
            MaterializeError::EncodeFailed(_)
        ));
    }
}
