//! Page data extraction functions.
//!
//! Turns a rendered document into the ordered list of images it references.

pub mod images;

pub use images::{ImageExtractor, extract_images};
