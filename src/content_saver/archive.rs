//! Zip packaging of materialized images
//!
//! Packs every successfully materialized file into one flat, deflate
//! compressed archive. The archive is assembled in a temp file beside the
//! destination and renamed into place, so re-running replaces any previous
//! archive at the same path in one step.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::time::timeout;

use super::materializer::MaterializedFile;
use crate::utils::ARCHIVE_MIME_TYPE;

/// Timeout for the blocking packaging task
const ARCHIVE_TIMEOUT: Duration = Duration::from_secs(300);

/// Packaging failure
///
/// The materialized files on disk are untouched by this error; only the
/// archive step failed. A partially written archive is never left at the
/// destination path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArchiveError {
    #[error("Failed to write archive {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },
}

impl ArchiveError {
    fn write_failed(path: &Path, reason: impl std::fmt::Display) -> Self {
        Self::WriteFailed {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Location and shape of a written archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Entry names in archive order
    pub entries: Vec<String>,
}

/// Archive bytes prepared for a download affordance
#[derive(Debug, Clone)]
pub struct ArchiveDownload {
    /// Suggested file name (the archive's own file name)
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Pack successful materializations into a zip at `output_path`
///
/// Entry names are the file names of each local path (flat namespace), in
/// input order. Failed materializations are skipped. An input with no
/// successes produces a valid, empty archive.
pub async fn archive(
    materialized: &[MaterializedFile],
    output_path: &Path,
) -> Result<ArchiveSummary, ArchiveError> {
    let sources: Vec<PathBuf> = materialized
        .iter()
        .filter(|file| file.is_success())
        .filter_map(|file| file.local_path.clone())
        .collect();

    let output_path_buf = output_path.to_path_buf();
    let blocking_task =
        tokio::task::spawn_blocking(move || write_archive(&sources, &output_path_buf));

    match timeout(ARCHIVE_TIMEOUT, blocking_task).await {
        Ok(Ok(result)) => {
            if let Ok(summary) = &result {
                log::info!(
                    "Archived {} images into {} ({} bytes)",
                    summary.entries.len(),
                    summary.path.display(),
                    summary.size_bytes
                );
            }
            result
        }
        Ok(Err(join_error)) => Err(ArchiveError::write_failed(
            output_path,
            format!("archive task failed: {join_error}"),
        )),
        Err(_) => {
            log::error!(
                "Archive packaging timed out after {:?} for {}",
                ARCHIVE_TIMEOUT,
                output_path.display()
            );
            Err(ArchiveError::write_failed(
                output_path,
                format!("timed out after {ARCHIVE_TIMEOUT:?}"),
            ))
        }
    }
}

fn write_archive(sources: &[PathBuf], output_path: &Path) -> Result<ArchiveSummary, ArchiveError> {
    let fail = |reason: String| ArchiveError::write_failed(output_path, reason);

    let parent_dir = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent_dir)
        .map_err(|e| fail(format!("cannot create {}: {e}", parent_dir.display())))?;

    // Create temp file in same directory as target (ATOMIC)
    let temp_file = NamedTempFile::new_in(&parent_dir)
        .map_err(|e| fail(format!("cannot create temp file: {e}")))?;

    let mut zip = zip::ZipWriter::new(temp_file);
    let options = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut entries = Vec::with_capacity(sources.len());
    for source in sources {
        let entry_name = source
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| fail(format!("invalid entry name for {}", source.display())))?
            .to_string();

        let file = File::open(source)
            .map_err(|e| fail(format!("cannot read {}: {e}", source.display())))?;
        let mut reader = BufReader::new(file);

        zip.start_file(entry_name.as_str(), options)
            .map_err(|e| fail(format!("cannot add entry {entry_name}: {e}")))?;
        std::io::copy(&mut reader, &mut zip)
            .map_err(|e| fail(format!("cannot read {}: {e}", source.display())))?;

        entries.push(entry_name);
    }

    let mut temp_file = zip
        .finish()
        .map_err(|e| fail(format!("cannot finalize archive: {e}")))?;
    temp_file
        .flush()
        .map_err(|e| fail(format!("cannot flush archive: {e}")))?;

    // Atomically rename temp file to final path, replacing any previous archive
    temp_file
        .persist(output_path)
        .map_err(|e| fail(format!("cannot move archive into place: {}", e.error)))?;

    let size_bytes = std::fs::metadata(output_path).map(|m| m.len()).unwrap_or(0);

    Ok(ArchiveSummary {
        path: output_path.to_path_buf(),
        size_bytes,
        entries,
    })
}

/// Read a finished archive for handing to a download button
pub async fn read_for_download(path: &Path) -> anyhow::Result<ArchiveDownload> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read archive {}: {e}", path.display()))?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| sanitize_filename::sanitize(name))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "images.zip".to_string());

    Ok(ArchiveDownload {
        file_name,
        mime_type: ARCHIVE_MIME_TYPE,
        bytes,
    })
}
