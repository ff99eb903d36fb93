use serde::Serialize;
use thiserror::Error;

use crate::db::DatabaseError;
use crate::error::{ConversionError, NotFoundError, StorageError, ThumbnailError};

/// Underlying failure of a single ingest stage.
#[derive(Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Thumbnail(#[from] ThumbnailError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Ingest failure as reported to the caller. Stage variants display a fixed
/// message naming the stage; the underlying cause (which may carry absolute
/// paths) is only reachable through `source()` for server-side logs.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error("Something went wrong. Could not store the uploaded file.")]
    PersistFailed(#[source] StageError),

    #[error("Something went wrong. Could not rename file.")]
    RenameFailed(#[source] StageError),

    #[error("Something went wrong. Could not convert to webp.")]
    ConversionFailed(#[source] StageError),

    #[error("Something went wrong. Could not remove files not attached to any visual.")]
    SweepFailed(#[source] CleanupError),

    #[error("Something went wrong. Could not generate thumbnails.")]
    ThumbnailFailed(#[source] StageError),
}

impl IngestError {
    /// True when the failure is reported to the client as a rejected request
    /// (the 4xx family). Every ingest failure is: an unknown commission and
    /// each stage failure alike.
    pub fn is_client_error(&self) -> bool {
        match self {
            IngestError::NotFound(_)
            | IngestError::PersistFailed(_)
            | IngestError::RenameFailed(_)
            | IngestError::ConversionFailed(_)
            | IngestError::SweepFailed(_)
            | IngestError::ThumbnailFailed(_) => true,
        }
    }

    /// Stage that failed, `None` for a rejected request.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            IngestError::NotFound(_) => None,
            IngestError::PersistFailed(_) => Some("persist"),
            IngestError::RenameFailed(_) => Some("rename"),
            IngestError::ConversionFailed(_) => Some("convert"),
            IngestError::SweepFailed(_) => Some("sweep"),
            IngestError::ThumbnailFailed(_) => Some("thumbnails"),
        }
    }
}

/// Failures of delete and sweep operations.
#[derive(Error, Debug)]
pub enum CleanupError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error("Storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Database failed: {0}")]
    Database(#[from] DatabaseError),
}

/// Non-fatal problems collected while the operation carried on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    RemoveFailed { path: String, error: String },
    DeleteFailed { asset_id: i64, error: String },
    RollbackFailed { group_id: String, error: String },
}
