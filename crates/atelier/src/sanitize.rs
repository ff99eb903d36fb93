//! Helpers for sanitizing data before it enters tracing span attributes.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
///
/// Safe for span fields: reveals the file name without exposing where the
/// media root lives or what the client's local path looked like.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}
