//! Post-commit notifications for stored files.
//!
//! Repositories whose rows own a file (goal images) call
//! [`Database::release_file`](super::Database) once a delete or a file
//! replacement has committed. Storage backends register a hook to remove the
//! file; nothing is deleted implicitly by the persistence layer itself.

/// Receives the media-root-relative path of a file that no row references
/// any more.
pub trait FileReleaseHook: Send + Sync {
    fn file_released(&self, relative_path: &str);
}

/// Hook that only records released paths.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingHook {
    released: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingHook {
    pub(crate) fn released(&self) -> Vec<String> {
        self.released.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl FileReleaseHook for RecordingHook {
    fn file_released(&self, relative_path: &str) {
        self.released.lock().unwrap().push(relative_path.to_string());
    }
}
