//! Download file naming.
//!
//! The on-disk name of a package is derived from the item's display title, not its
//! identifier. Two titles that reduce to the same stem share a file.

use std::path::{Path, PathBuf};

/// Stem used when a title has no ASCII alphanumeric characters at all.
pub const FALLBACK_STEM: &str = "package";

/// Reduce a title to its ASCII alphanumeric characters. Whitespace goes with
/// everything else, so the result never needs trimming.
pub fn sanitize_title(title: &str) -> String {
    title.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// File name for a title: sanitized stem plus `.{extension}`.
///
/// `"Space Jump!"` with extension `apk` becomes `SpaceJump.apk`.
pub fn destination_file_name(title: &str, extension: &str) -> String {
    let stem = sanitize_title(title);
    let stem = if stem.is_empty() {
        FALLBACK_STEM
    } else {
        stem.as_str()
    };
    format!("{stem}.{extension}")
}

pub fn destination_path(downloads_dir: &Path, title: &str, extension: &str) -> PathBuf {
    downloads_dir.join(destination_file_name(title, extension))
}
