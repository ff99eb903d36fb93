use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::db::FileReleaseHook;
use crate::error::StorageError;

/// Move a file from `src` to `dst`. Uses `rename` first (atomic on the same
/// filesystem) and falls back to copy + delete for cross-device moves.
fn move_file(src: &Path, dst: &Path) -> Result<(), StorageError> {
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    std::fs::copy(src, dst).map_err(|e| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    std::fs::remove_file(src).map_err(|e| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

/// Splits `name` into stem and extension (without the dot).
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < name.len() => (&name[..dot], Some(&name[dot + 1..])),
        _ => (name, None),
    }
}

/// Last segment of a `/`-separated relative path.
pub fn basename(relative: &str) -> &str {
    relative.rsplit('/').next().unwrap_or(relative)
}

/// Reduces a client-supplied filename to a safe single path segment.
pub fn clean_filename(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = last
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// A file found in a storage directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Media-root-relative path, `None` when the name is not valid UTF-8.
    /// Rows only hold UTF-8 paths, so such a file is never referenced.
    pub relative: Option<String>,
    /// Relative path with invalid bytes replaced, for reports and logs.
    pub display: String,
}

/// Files under the media root, addressed by `/`-separated paths relative to
/// that root. These relative paths are what the database stores.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a stored file. Rejects paths that would leave
    /// the media root.
    pub fn absolute(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let candidate = Path::new(relative);
        let escapes = candidate
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(StorageError::OutsideRoot(candidate.to_path_buf()));
        }
        Ok(self.root.join(candidate))
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.absolute(relative)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }

    /// A fresh random name with the given extension, lower-cased.
    pub fn random_name(extension: Option<&str>) -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        match extension {
            Some(ext) => format!("{}.{}", id, ext.to_lowercase()),
            None => id,
        }
    }

    /// Stores uploaded bytes in `relative_directory` under the cleaned client
    /// filename, numbering it `_2`, `_3`, ... on conflict. Returns the
    /// relative path of the created file.
    pub fn store_upload(
        &self,
        content: &[u8],
        relative_directory: &str,
        filename: &str,
    ) -> Result<String, StorageError> {
        let dir_path = self.absolute(relative_directory)?;
        self.ensure_directory(&dir_path)?;

        let filename = clean_filename(filename);
        let created = self.store_with_atomic_creation(&dir_path, &filename, content)?;
        let name = created
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&filename);

        Ok(join_relative(relative_directory, name))
    }

    /// Creates the file with O_EXCL semantics, trying numbered variants of
    /// the name until one is free.
    fn store_with_atomic_creation(
        &self,
        dir_path: &Path,
        filename: &str,
        content: &[u8],
    ) -> Result<PathBuf, StorageError> {
        let (base, ext) = split_extension(filename);

        for counter in 1..=1000 {
            let try_filename = match (counter, ext) {
                (1, _) => filename.to_string(),
                (_, Some(ext)) => format!("{}_{}.{}", base, counter, ext),
                (_, None) => format!("{}_{}", base, counter),
            };

            let try_path = dir_path.join(&try_filename);
            match create_exclusive(&try_path, content) {
                Ok(true) => return Ok(try_path),
                Ok(false) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(StorageError::FileExists(dir_path.join(filename)))
    }

    /// Writes `content` to `relative`, replacing any existing file.
    pub fn write(&self, relative: &str, content: &[u8]) -> Result<(), StorageError> {
        let path = self.absolute(relative)?;
        if let Some(parent) = path.parent() {
            self.ensure_directory(parent)?;
        }
        std::fs::write(&path, content).map_err(|e| StorageError::WriteFile { path, source: e })
    }

    /// Writes `content` only if nothing exists at `relative` yet.
    /// Returns false, leaving the existing file untouched, otherwise.
    pub fn write_new(&self, relative: &str, content: &[u8]) -> Result<bool, StorageError> {
        let path = self.absolute(relative)?;
        if let Some(parent) = path.parent() {
            self.ensure_directory(parent)?;
        }
        create_exclusive(&path, content)
    }

    /// Moves a stored file to another relative path.
    pub fn move_file(&self, from: &str, to: &str) -> Result<(), StorageError> {
        let src = self.absolute(from)?;
        let dst = self.absolute(to)?;
        if let Some(parent) = dst.parent() {
            self.ensure_directory(parent)?;
        }
        move_file(&src, &dst)
    }

    /// Removes a stored file. A file that is already gone is not an error;
    /// returns whether anything was removed.
    pub fn remove_if_exists(&self, relative: &str) -> Result<bool, StorageError> {
        let path = self.absolute(relative)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::RemoveFile { path, source: e }),
        }
    }

    /// Regular files directly inside `relative_directory`, sorted by path.
    /// A missing directory lists as empty. Names that are not valid UTF-8 are
    /// listed too, without a relative path.
    pub fn list_files(&self, relative_directory: &str) -> Result<Vec<StoredFile>, StorageError> {
        let dir_path = self.absolute(relative_directory)?;
        if !dir_path.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&dir_path).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| StorageError::ListDirectory {
                path: dir_path.clone(),
                source: e,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .file_name()
                .to_str()
                .map(|name| join_relative(relative_directory, name));
            files.push(StoredFile {
                display: join_relative(relative_directory, &entry.file_name().to_string_lossy()),
                relative,
                path: entry.into_path(),
            });
        }
        Ok(files)
    }

    /// Removes a file found by [`list_files`](Self::list_files). Works for
    /// names without a relative path; returns whether anything was removed.
    pub fn remove_listed(&self, file: &StoredFile) -> Result<bool, StorageError> {
        if !file.path.starts_with(&self.root) {
            return Err(StorageError::OutsideRoot(file.path.clone()));
        }
        match std::fs::remove_file(&file.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::RemoveFile {
                path: file.path.clone(),
                source: e,
            }),
        }
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        if !path.exists() {
            std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }
}

/// Files released by the persistence layer are removed from disk.
impl FileReleaseHook for MediaStorage {
    fn file_released(&self, relative_path: &str) {
        match self.remove_if_exists(relative_path) {
            Ok(true) => log::info!("Removed released file {}", relative_path),
            Ok(false) => log::debug!("Released file {} was already gone", relative_path),
            Err(e) => log::warn!("Failed to remove released file: {}", e),
        }
    }
}

fn create_exclusive(path: &Path, content: &[u8]) -> Result<bool, StorageError> {
    use std::io::Write;

    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(mut file) => {
            file.write_all(content)
                .map_err(|e| StorageError::WriteFile {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(StorageError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

pub fn join_relative(directory: &str, name: &str) -> String {
    let directory = directory.trim_end_matches('/');
    if directory.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", directory, name)
    }
}
