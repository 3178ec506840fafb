//! Upload helpers

use std::path::Path;

/// Validate that a file has an allowed extension
#[cfg_attr(not(feature = "web"), allow(dead_code))]
pub(crate) fn validate_file_extension(filename: &str, allowed_extensions: &[String]) -> bool {
    if let Some(ext) = Path::new(filename).extension() {
        if let Some(ext_str) = ext.to_str() {
            return allowed_extensions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(ext_str));
        }
    }
    false
}

/// Whether the file name maps to an `image/*` MIME type
#[cfg_attr(not(feature = "web"), allow(dead_code))]
pub(crate) fn is_image_file(filename: &str) -> bool {
    mime_guess::from_path(filename)
        .iter()
        .any(|mime| mime.type_() == mime_guess::mime::IMAGE)
}
