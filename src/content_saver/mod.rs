//! Content saving: image materialization and archive packaging.
//!
//! `materializer` fetches and normalizes discovered images into the working
//! directory; `archive` packs the results into a single zip.

pub mod archive;
pub mod downloader;
pub mod image_convert;
pub mod materializer;

pub use archive::{ArchiveDownload, ArchiveError, ArchiveSummary, archive, read_for_download};
pub use downloader::{DownloadLimits, build_http_client, decode_data_url, fetch_image_bytes};
pub use image_convert::{ConvertError, NormalizedImage, OutputFormat, normalize_image};
pub use materializer::{
    MaterializeError, MaterializeOptions, MaterializedFile, Materializer, materialized_file_name,
};
