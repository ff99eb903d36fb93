use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AtelierError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Thumbnail error: {0}")]
    Thumbnail(#[from] ThumbnailError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error(transparent)]
    Ingest(#[from] crate::pipeline::IngestError),

    #[error(transparent)]
    Cleanup(#[from] crate::pipeline::CleanupError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move file from '{from}' to '{to}': {source}")]
    MoveFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove file '{path}': {source}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list directory '{path}': {source}")]
    ListDirectory {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Path escapes the media root: {0}")]
    OutsideRoot(PathBuf),

    #[error("File already exists: {0}")]
    FileExists(PathBuf),
}

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Failed to decode image '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode image as {format}: {source}")]
    Encode {
        format: String,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("Failed to read dimensions of '{path}': {source}")]
    Dimensions {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to decode source image '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode {size}px thumbnail: {source}")]
    Encode {
        size: u32,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("Commission {0} not found")]
    Commission(i64),

    #[error("Visual asset {0} not found")]
    Asset(i64),

    #[error("No visual assets in group '{0}'")]
    Group(String),

    #[error("Goal {0} not found")]
    Goal(i64),
}

pub type Result<T> = std::result::Result<T, AtelierError>;
