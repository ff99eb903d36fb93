pub mod image;
pub mod ladder;

pub use self::image::{format_for_extension, ImageProcessor};
pub use ladder::thumbnail_sizes;

use crate::storage::split_extension;

/// Lower-cased extension of a stored file, if it has one.
pub fn extension_of(relative: &str) -> Option<String> {
    let name = crate::storage::basename(relative);
    split_extension(name).1.map(|ext| ext.to_lowercase())
}

/// Path of the `size` thumbnail derived from `relative`: `<stem>_<size>.<ext>`
/// next to the original.
pub fn derived_path(relative: &str, size: u32) -> String {
    let (directory, name) = split_directory(relative);
    match split_extension(name) {
        (stem, Some(ext)) => format!("{}{}_{}.{}", directory, stem, size, ext),
        (stem, None) => format!("{}{}_{}", directory, stem, size),
    }
}

/// `relative` with its extension replaced by `extension`.
pub fn with_extension(relative: &str, extension: &str) -> String {
    let (directory, name) = split_directory(relative);
    let (stem, _) = split_extension(name);
    format!("{}{}.{}", directory, stem, extension)
}

/// Splits off everything up to and including the last `/`.
fn split_directory(relative: &str) -> (&str, &str) {
    match relative.rfind('/') {
        Some(slash) => relative.split_at(slash + 1),
        None => ("", relative),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("commissions/files/A.JPG"), Some("jpg".to_string()));
        assert_eq!(extension_of("commissions/files/clip"), None);
        assert_eq!(extension_of("some.dir/clip"), None);
    }

    #[test]
    fn test_derived_path() {
        assert_eq!(
            derived_path("commissions/files/abc.webp", 512),
            "commissions/files/abc_512.webp"
        );
        assert_eq!(derived_path("v1.2/clip", 256), "v1.2/clip_256");
    }

    #[test]
    fn test_with_extension() {
        assert_eq!(
            with_extension("commissions/files/abc.png", "webp"),
            "commissions/files/abc.webp"
        );
    }
}
