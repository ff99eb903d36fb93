use crate::db::visual_repo::VisualAssetRow;

use super::error::PipelineWarning;
use super::progress::AssetState;

/// One uploaded file and the metadata it arrived with.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-supplied filename; only its last segment is used.
    pub filename: String,
    pub content: Vec<u8>,
    pub commission_id: i64,
    pub is_explicit: bool,
    pub is_restricted: bool,
    pub is_video: bool,
    pub display_order: i64,
}

impl Upload {
    pub fn new(filename: &str, content: Vec<u8>, commission_id: i64) -> Self {
        Self {
            filename: filename.to_string(),
            content,
            commission_id,
            is_explicit: false,
            is_restricted: false,
            is_video: false,
            display_order: 0,
        }
    }
}

pub struct IngestContext {
    // Input
    pub upload: Upload,
    pub group_id: String,

    // Step 1 result, guaranteed Some after step_persist
    pub asset: Option<VisualAssetRow>,

    pub state: AssetState,

    // Step 5 result
    pub thumbnails: Vec<VisualAssetRow>,

    // Non-fatal warnings
    pub warnings: Vec<PipelineWarning>,
}

impl IngestContext {
    pub fn new(upload: Upload) -> Self {
        Self {
            upload,
            group_id: uuid::Uuid::new_v4().to_string(),
            asset: None,
            state: AssetState::Uploaded,
            thumbnails: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Result of a successful ingest.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub asset: VisualAssetRow,
    pub thumbnails: Vec<VisualAssetRow>,
    pub warnings: Vec<PipelineWarning>,
}
