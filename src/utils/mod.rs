pub mod constants;
pub mod url_utils;

pub use constants::*;
pub use url_utils::{
    archive_path_for, is_data_url, is_valid_url, normalize_start_url, source_image_extension,
};
