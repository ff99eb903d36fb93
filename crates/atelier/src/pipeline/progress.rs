use std::fmt;

/// Lifecycle of an asset's file while it moves through the pipeline.
/// Transitions only go forward: `Uploaded -> Renamed -> (Converted |
/// SkippedConversion) -> Final`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetState {
    Uploaded,
    Renamed,
    Converted,
    SkippedConversion,
    Final,
}

impl fmt::Display for AssetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssetState::Uploaded => "uploaded",
            AssetState::Renamed => "renamed",
            AssetState::Converted => "converted",
            AssetState::SkippedConversion => "skipped_conversion",
            AssetState::Final => "final",
        };
        f.write_str(name)
    }
}

/// Events emitted by the pipeline during an ingest.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Transition {
        state: AssetState,
        storage_path: String,
    },
    ThumbnailCreated {
        size: u32,
        storage_path: String,
    },
    Completed {
        asset_id: i64,
        thumbnails: usize,
    },
    Failed {
        error: String,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Writes every event to the tracing subscriber.
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Transition {
                state,
                storage_path,
            } => tracing::info!(%state, path = %storage_path, "asset state changed"),
            ProgressEvent::ThumbnailCreated { size, storage_path } => {
                tracing::info!(size, path = %storage_path, "thumbnail created")
            }
            ProgressEvent::Completed {
                asset_id,
                thumbnails,
            } => tracing::info!(asset_id, thumbnails, "ingest completed"),
            ProgressEvent::Failed { error } => tracing::warn!(%error, "ingest failed"),
        }
    }
}
