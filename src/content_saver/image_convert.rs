//! Image decoding and normalization
//!
//! Every fetched image is decoded, flattened to three-channel RGB (alpha is
//! dropped), optionally resized, and re-encoded in one canonical format.

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

/// Canonical encoding for materialized images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    WebP,
    Bmp,
    Tiff,
}

impl OutputFormat {
    /// Extension used when the source URL carries no recognized one
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
        }
    }

    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
        }
    }

    #[must_use]
    pub const fn image_format(&self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::WebP => ImageFormat::WebP,
            Self::Bmp => ImageFormat::Bmp,
            Self::Tiff => ImageFormat::Tiff,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::WebP => "webp",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
        };
        f.write_str(name)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::WebP),
            "bmp" => Ok(Self::Bmp),
            "tif" | "tiff" => Ok(Self::Tiff),
            other => Err(format!(
                "unsupported output format '{other}' (expected png, jpeg, webp, bmp or tiff)"
            )),
        }
    }
}

/// Why an image could not be normalized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConvertError {
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
}

/// A re-encoded image ready to be written to disk
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decode `bytes`, convert to RGB8, optionally resize, and encode as `format`
///
/// CPU bound; callers on the async runtime should run this via
/// `tokio::task::spawn_blocking`.
pub fn normalize_image(
    bytes: &[u8],
    format: OutputFormat,
    resize: Option<(u32, u32)>,
) -> Result<NormalizedImage, ConvertError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| ConvertError::Decode(e.to_string()))?;

    let mut rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
    if let Some((width, height)) = resize {
        rgb = rgb.resize_exact(width, height, FilterType::Lanczos3);
    }

    let (width, height) = (rgb.width(), rgb.height());
    let mut cursor = Cursor::new(Vec::new());
    rgb.write_to(&mut cursor, format.image_format())
        .map_err(|e| ConvertError::Encode(e.to_string()))?;

    Ok(NormalizedImage {
        bytes: cursor.into_inner(),
        width,
        height,
    })
}
