//! Deletion and orphan sweeping.
//!
//! Every delete follows the same order: remove the file (a missing file is
//! fine), then delete the row. Sweeps remove files in the visuals directory
//! whose basename no row references.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, info_span, warn};

use crate::db::commission_repo;
use crate::db::visual_repo::{self, VisualAssetRow};
use crate::error::NotFoundError;
use crate::storage::basename;

use super::error::{CleanupError, PipelineWarning};
use super::runner::Pipeline;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    /// Relative paths of the files that were removed.
    pub removed: Vec<String>,
    pub failures: Vec<PipelineWarning>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeleteReport {
    pub deleted: Vec<i64>,
    pub warnings: Vec<PipelineWarning>,
    pub sweep: SweepReport,
}

impl Pipeline {
    /// Removes every file in the visuals directory that no row references.
    /// Individual removal failures are reported, not raised.
    pub fn sweep(&self) -> Result<SweepReport, CleanupError> {
        let _span = info_span!("pipeline.sweep").entered();

        let referenced: HashSet<String> = visual_repo::all_storage_paths(&self.db)?
            .iter()
            .map(|path| basename(path).to_string())
            .collect();
        let files = self.storage.list_files(&self.config.visuals_directory)?;

        let mut report = SweepReport::default();
        for file in files {
            let is_referenced = file
                .relative
                .as_deref()
                .is_some_and(|relative| referenced.contains(basename(relative)));
            if is_referenced {
                continue;
            }
            match self.storage.remove_listed(&file) {
                Ok(true) => {
                    info!("Removed unreferenced file {}", basename(&file.display));
                    report.removed.push(file.display);
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("Failed to remove unreferenced file: {}", e);
                    report.failures.push(PipelineWarning::RemoveFailed {
                        path: file.display,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Deletes one asset: its file, its row, then a sweep. Thumbnails of the
    /// same group are left alone.
    pub fn delete(&self, asset_id: i64) -> Result<SweepReport, CleanupError> {
        let _span = info_span!("pipeline.delete", asset_id).entered();

        let asset = visual_repo::find_by_id(&self.db, asset_id)?
            .ok_or(NotFoundError::Asset(asset_id))?;
        self.remove_asset(&asset)?;
        self.sweep()
    }

    /// Deletes every member of a group, carrying on past per-item failures,
    /// then sweeps once.
    pub fn delete_group(&self, group_id: &str) -> Result<DeleteReport, CleanupError> {
        let _span = info_span!("pipeline.delete_group", group_id = %group_id).entered();

        if visual_repo::count_by_group(&self.db, group_id)? == 0 {
            return Err(NotFoundError::Group(group_id.to_string()).into());
        }

        let mut report = DeleteReport::default();
        for asset in visual_repo::find_by_group(&self.db, group_id)? {
            match self.remove_asset(&asset) {
                Ok(()) => report.deleted.push(asset.id),
                Err(e) => {
                    warn!("Failed to delete asset {}: {}", asset.id, e);
                    report.warnings.push(PipelineWarning::DeleteFailed {
                        asset_id: asset.id,
                        error: e.to_string(),
                    });
                }
            }
        }
        report.sweep = self.sweep()?;
        Ok(report)
    }

    /// Deletes a commission; its visual rows cascade and the sweep removes
    /// their files.
    pub fn delete_commission(&self, commission_id: i64) -> Result<SweepReport, CleanupError> {
        let _span = info_span!("pipeline.delete_commission", commission_id).entered();

        if !commission_repo::delete(&self.db, commission_id)? {
            return Err(NotFoundError::Commission(commission_id).into());
        }
        self.sweep()
    }

    /// Group deletion used by rollback: an empty group is not an error.
    pub(super) fn delete_group_members(
        &self,
        group_id: &str,
    ) -> Result<Vec<PipelineWarning>, CleanupError> {
        let mut warnings = Vec::new();
        for asset in visual_repo::find_by_group(&self.db, group_id)? {
            if let Err(e) = self.remove_asset(&asset) {
                warnings.push(PipelineWarning::DeleteFailed {
                    asset_id: asset.id,
                    error: e.to_string(),
                });
            }
        }
        Ok(warnings)
    }

    fn remove_asset(&self, asset: &VisualAssetRow) -> Result<(), CleanupError> {
        self.storage.remove_if_exists(&asset.storage_path)?;
        visual_repo::delete(&self.db, asset.id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::commission_repo::NewCommission;
    use crate::db::visual_repo::NewVisualAsset;
    use crate::db::Database;
    use crate::pipeline::config::PipelineConfig;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Pipeline, i64) {
        let tmp = TempDir::new().unwrap();
        let db = Database::open_in_memory().unwrap();
        let commission = commission_repo::insert(&db, &NewCommission::titled("Badge")).unwrap();
        let config = PipelineConfig {
            media_root: tmp.path().to_path_buf(),
            visuals_directory: "files".to_string(),
            goals_directory: "goals".to_string(),
            min_thumbnail_size: 256,
            convert_extensions: vec!["png".into()],
            thumbnail_extensions: vec!["png".into(), "webp".into()],
        };
        let pipeline = Pipeline::from_config(Arc::new(config), db).unwrap();
        (tmp, pipeline, commission.id)
    }

    fn stored_asset(pipeline: &Pipeline, commission_id: i64, path: &str, group: &str) -> VisualAssetRow {
        pipeline.storage().write(path, b"bytes").unwrap();
        visual_repo::insert(
            pipeline.database(),
            &NewVisualAsset {
                commission_id,
                storage_path: path.to_string(),
                is_explicit: false,
                is_restricted: false,
                is_video: false,
                group_id: group.to_string(),
                display_order: 0,
                thumbnail_size: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_sweep_removes_only_unreferenced() {
        let (_tmp, pipeline, commission_id) = setup();
        stored_asset(&pipeline, commission_id, "files/kept.webp", "g1");
        pipeline.storage().write("files/orphan.webp", b"x").unwrap();

        let report = pipeline.sweep().unwrap();

        assert_eq!(report.removed, vec!["files/orphan.webp".to_string()]);
        assert!(report.failures.is_empty());
        assert!(pipeline.storage().exists("files/kept.webp"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_sweep_removes_non_utf8_orphan() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let (tmp, pipeline, commission_id) = setup();
        stored_asset(&pipeline, commission_id, "files/kept.webp", "g1");
        pipeline.storage().write("files/orphan.webp", b"x").unwrap();
        let odd = tmp.path().join("files").join(OsStr::from_bytes(b"orphan\xff.webp"));
        std::fs::write(&odd, b"x").unwrap();

        let report = pipeline.sweep().unwrap();

        assert_eq!(report.removed.len(), 2);
        assert!(report.removed.contains(&"files/orphan.webp".to_string()));
        assert!(report.failures.is_empty());
        assert!(!odd.exists());
        assert!(pipeline.storage().exists("files/kept.webp"));
    }

    #[test]
    fn test_sweep_without_directory() {
        let (_tmp, pipeline, _) = setup();
        assert_eq!(pipeline.sweep().unwrap(), SweepReport::default());
    }

    #[test]
    fn test_delete_removes_file_and_row() {
        let (_tmp, pipeline, commission_id) = setup();
        let asset = stored_asset(&pipeline, commission_id, "files/a.webp", "g1");
        let sibling = stored_asset(&pipeline, commission_id, "files/a_256.webp", "g1");

        pipeline.delete(asset.id).unwrap();

        assert!(!pipeline.storage().exists("files/a.webp"));
        assert!(visual_repo::find_by_id(pipeline.database(), asset.id)
            .unwrap()
            .is_none());
        assert!(visual_repo::find_by_id(pipeline.database(), sibling.id)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_delete_tolerates_missing_file() {
        let (_tmp, pipeline, commission_id) = setup();
        let asset = stored_asset(&pipeline, commission_id, "files/gone.webp", "g1");
        std::fs::remove_file(pipeline.storage().absolute("files/gone.webp").unwrap()).unwrap();

        pipeline.delete(asset.id).unwrap();
        assert!(visual_repo::find_by_id(pipeline.database(), asset.id)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_delete_unknown_asset() {
        let (_tmp, pipeline, _) = setup();
        let result = pipeline.delete(5);
        assert!(matches!(
            result,
            Err(CleanupError::NotFound(NotFoundError::Asset(5)))
        ));
    }

    #[test]
    fn test_delete_group() {
        let (_tmp, pipeline, commission_id) = setup();
        stored_asset(&pipeline, commission_id, "files/b.webp", "g2");
        stored_asset(&pipeline, commission_id, "files/b_256.webp", "g2");
        let other = stored_asset(&pipeline, commission_id, "files/c.webp", "g3");

        let report = pipeline.delete_group("g2").unwrap();

        assert_eq!(report.deleted.len(), 2);
        assert!(report.warnings.is_empty());
        assert_eq!(visual_repo::count_by_group(pipeline.database(), "g2").unwrap(), 0);
        let remaining: Vec<String> = pipeline
            .storage()
            .list_files("files")
            .unwrap()
            .into_iter()
            .map(|f| f.display)
            .collect();
        assert_eq!(remaining, vec![other.storage_path]);
    }

    #[test]
    fn test_delete_empty_group_is_not_found() {
        let (_tmp, pipeline, _) = setup();
        assert!(matches!(
            pipeline.delete_group("nope"),
            Err(CleanupError::NotFound(NotFoundError::Group(_)))
        ));
    }

    #[test]
    fn test_delete_commission_sweeps_cascaded_files() {
        let (_tmp, pipeline, commission_id) = setup();
        stored_asset(&pipeline, commission_id, "files/d.webp", "g4");

        let report = pipeline.delete_commission(commission_id).unwrap();

        assert_eq!(report.removed, vec!["files/d.webp".to_string()]);
        assert!(matches!(
            pipeline.delete_commission(commission_id),
            Err(CleanupError::NotFound(NotFoundError::Commission(_)))
        ));
    }
}
