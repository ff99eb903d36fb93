use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info_span, warn};

use crate::db::commission_repo;
use crate::db::visual_repo::{self, NewVisualAsset, VisualAssetRow};
use crate::db::{Database, DatabaseError};
use crate::error::NotFoundError;
use crate::processor::{self, format_for_extension, thumbnail_sizes, ImageProcessor};
use crate::sanitize;
use crate::storage::filesystem::join_relative;
use crate::storage::MediaStorage;

use super::config::PipelineConfig;
use super::context::{IngestContext, IngestOutcome, Upload};
use super::error::{IngestError, PipelineWarning, StageError};
use super::progress::{AssetState, ProgressEvent, ProgressReporter};

pub struct Pipeline {
    pub(super) config: Arc<PipelineConfig>,
    pub(super) db: Database,
    pub(super) storage: MediaStorage,
    processor: ImageProcessor,
}

impl Pipeline {
    /// Builds the pipeline and registers its storage as the database's
    /// file-release hook, so goal images are removed once their rows let go.
    pub fn from_config(config: Arc<PipelineConfig>, db: Database) -> Result<Self, DatabaseError> {
        let storage = MediaStorage::new(&config.media_root);
        db.register_file_hook(Arc::new(storage.clone()))?;

        Ok(Self {
            config,
            db,
            storage,
            processor: ImageProcessor::new(),
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn storage(&self) -> &MediaStorage {
        &self.storage
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs every ingest stage for one upload and returns the original
    /// asset's final record. Any stage failure rolls back the whole group.
    pub fn ingest(
        &self,
        upload: Upload,
        progress: &dyn ProgressReporter,
    ) -> Result<IngestOutcome, IngestError> {
        let filename = sanitize::redact_path(Path::new(&upload.filename));
        let _pipeline_span = info_span!("pipeline.ingest",
            commission_id = upload.commission_id,
            filename = %filename,
            is_video = upload.is_video,
        )
        .entered();

        let commission_known = commission_repo::exists(&self.db, upload.commission_id)
            .map_err(|e| IngestError::PersistFailed(e.into()))?;
        if !commission_known {
            let err = IngestError::from(NotFoundError::Commission(upload.commission_id));
            progress.report(ProgressEvent::Failed {
                error: err.to_string(),
            });
            return Err(err);
        }

        let mut ctx = IngestContext::new(upload);

        // Step 1: Persist the upload and create the original row
        {
            let _step = info_span!("persist").entered();
            if let Err(e) = self.step_persist(&mut ctx, progress) {
                return Err(self.fail(&mut ctx, IngestError::PersistFailed(e), progress));
            }
        }

        // Step 2: Rename to a random unique filename
        {
            let _step = info_span!("rename").entered();
            if let Err(e) = self.step_rename(&mut ctx, progress) {
                return Err(self.fail(&mut ctx, IngestError::RenameFailed(e), progress));
            }
        }

        // Step 3: Convert rasters to WebP
        {
            let _step = info_span!("convert").entered();
            if let Err(e) = self.step_convert(&mut ctx, progress) {
                return Err(self.fail(&mut ctx, IngestError::ConversionFailed(e), progress));
            }
        }

        // Step 4: Remove unreferenced files
        {
            let _step = info_span!("sweep").entered();
            if let Err(e) = self.step_sweep(&mut ctx, progress) {
                return Err(self.fail(&mut ctx, IngestError::SweepFailed(e), progress));
            }
        }

        // Step 5: Thumbnail ladder
        {
            let _step = info_span!("thumbnails").entered();
            if let Err(e) = self.step_thumbnails(&mut ctx, progress) {
                return Err(self.fail(&mut ctx, IngestError::ThumbnailFailed(e), progress));
            }
        }

        let asset = ctx.asset.take().expect("step 1 completed");

        progress.report(ProgressEvent::Completed {
            asset_id: asset.id,
            thumbnails: ctx.thumbnails.len(),
        });

        Ok(IngestOutcome {
            asset,
            thumbnails: ctx.thumbnails,
            warnings: ctx.warnings,
        })
    }

    /// Runs the thumbnail stage alone for an existing original. Sizes whose
    /// file already exists are skipped, so repeated calls add nothing.
    pub fn generate_thumbnails(
        &self,
        asset_id: i64,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<VisualAssetRow>, IngestError> {
        let _span = info_span!("pipeline.generate_thumbnails", asset_id).entered();

        let asset = visual_repo::find_by_id(&self.db, asset_id)
            .map_err(|e| IngestError::ThumbnailFailed(e.into()))?
            .ok_or(NotFoundError::Asset(asset_id))?;

        self.thumbnails_for(&asset, progress)
            .map_err(IngestError::ThumbnailFailed)
    }

    fn step_persist(
        &self,
        ctx: &mut IngestContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), StageError> {
        let upload = &ctx.upload;
        let storage_path = self.storage.store_upload(
            &upload.content,
            &self.config.visuals_directory,
            &upload.filename,
        )?;

        let new_asset = NewVisualAsset {
            commission_id: upload.commission_id,
            storage_path: storage_path.clone(),
            is_explicit: upload.is_explicit,
            is_restricted: upload.is_restricted,
            is_video: upload.is_video,
            group_id: ctx.group_id.clone(),
            display_order: upload.display_order,
            thumbnail_size: None,
        };

        let asset = match visual_repo::insert(&self.db, &new_asset) {
            Ok(asset) => asset,
            Err(e) => {
                // No row references the file yet, so nothing else would clean it up.
                if let Err(remove_err) = self.storage.remove_if_exists(&storage_path) {
                    warn!("Failed to remove unrecorded upload: {}", remove_err);
                }
                return Err(e.into());
            }
        };

        debug!("Stored upload as {}", sanitize::redact_path(Path::new(&storage_path)));
        ctx.state = AssetState::Uploaded;
        progress.report(ProgressEvent::Transition {
            state: AssetState::Uploaded,
            storage_path,
        });
        ctx.asset = Some(asset);
        Ok(())
    }

    fn step_rename(
        &self,
        ctx: &mut IngestContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), StageError> {
        let asset = ctx.asset.as_mut().expect("step 1 completed");

        let extension = processor::extension_of(&asset.storage_path);
        let new_name = MediaStorage::random_name(extension.as_deref());
        let new_path = join_relative(&self.config.visuals_directory, &new_name);

        self.storage.move_file(&asset.storage_path, &new_path)?;
        visual_repo::update_storage_path(&self.db, asset.id, &new_path)?;

        debug!("Renamed asset {} to {}", asset.id, new_name);
        asset.storage_path = new_path;
        ctx.state = AssetState::Renamed;
        progress.report(ProgressEvent::Transition {
            state: AssetState::Renamed,
            storage_path: asset.storage_path.clone(),
        });
        Ok(())
    }

    fn step_convert(
        &self,
        ctx: &mut IngestContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), StageError> {
        let asset = ctx.asset.as_mut().expect("step 1 completed");

        let convertible = !asset.is_video
            && processor::extension_of(&asset.storage_path)
                .is_some_and(|ext| self.config.converts(&ext));
        if !convertible {
            ctx.state = AssetState::SkippedConversion;
            progress.report(ProgressEvent::Transition {
                state: AssetState::SkippedConversion,
                storage_path: asset.storage_path.clone(),
            });
            return Ok(());
        }

        let source = self.storage.absolute(&asset.storage_path)?;
        let webp = self.processor.convert_to_webp(&source)?;
        let converted_path = processor::with_extension(&asset.storage_path, "webp");

        // New file first, then the row, then the old file: the row never
        // points at a missing file.
        self.storage.write(&converted_path, &webp)?;
        visual_repo::update_storage_path(&self.db, asset.id, &converted_path)?;
        let previous = std::mem::replace(&mut asset.storage_path, converted_path);

        if let Err(e) = self.storage.remove_if_exists(&previous) {
            warn!("Failed to remove pre-conversion file: {}", e);
            ctx.warnings.push(PipelineWarning::RemoveFailed {
                path: previous,
                error: e.to_string(),
            });
        }

        ctx.state = AssetState::Converted;
        progress.report(ProgressEvent::Transition {
            state: AssetState::Converted,
            storage_path: asset.storage_path.clone(),
        });
        Ok(())
    }

    fn step_sweep(
        &self,
        ctx: &mut IngestContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), super::CleanupError> {
        let report = self.sweep()?;
        ctx.warnings.extend(report.failures);

        let asset = ctx.asset.as_ref().expect("step 1 completed");
        ctx.state = AssetState::Final;
        progress.report(ProgressEvent::Transition {
            state: AssetState::Final,
            storage_path: asset.storage_path.clone(),
        });
        Ok(())
    }

    fn step_thumbnails(
        &self,
        ctx: &mut IngestContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), StageError> {
        let asset = ctx.asset.as_ref().expect("step 1 completed");
        let created = self.thumbnails_for(asset, progress)?;
        ctx.thumbnails.extend(created);
        Ok(())
    }

    /// Writes every missing ladder size for `asset` and records a row for
    /// each, largest first.
    fn thumbnails_for(
        &self,
        asset: &VisualAssetRow,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<VisualAssetRow>, StageError> {
        let mut created = Vec::new();
        if asset.is_video || asset.is_thumbnail() {
            return Ok(created);
        }

        let Some(extension) = processor::extension_of(&asset.storage_path) else {
            return Ok(created);
        };
        let Some(format) = format_for_extension(&extension) else {
            return Ok(created);
        };
        if !self.config.thumbnails(&extension) {
            return Ok(created);
        }

        let source_path = self.storage.absolute(&asset.storage_path)?;
        let (width, height) = self.processor.dimensions(&source_path)?;
        let sizes = thumbnail_sizes(width.max(height), self.config.min_thumbnail_size);
        if sizes.is_empty() {
            debug!("{}x{} is below the smallest thumbnail size", width, height);
            return Ok(created);
        }

        let source = self.processor.open(&source_path)?;
        for size in sizes {
            let thumbnail_path = processor::derived_path(&asset.storage_path, size);
            if self.storage.exists(&thumbnail_path) {
                debug!("Thumbnail {} already exists, skipping", size);
                continue;
            }

            let bytes = self.processor.thumbnail(&source, size, format)?;
            if !self.storage.write_new(&thumbnail_path, &bytes)? {
                continue;
            }

            let row = visual_repo::insert(
                &self.db,
                &asset.derive_thumbnail(thumbnail_path.clone(), size),
            )?;
            progress.report(ProgressEvent::ThumbnailCreated {
                size,
                storage_path: thumbnail_path,
            });
            created.push(row);
        }

        Ok(created)
    }

    /// Reports the failure, rolls the group back and hands the error back.
    fn fail(
        &self,
        ctx: &mut IngestContext,
        err: IngestError,
        progress: &dyn ProgressReporter,
    ) -> IngestError {
        match std::error::Error::source(&err) {
            Some(cause) => warn!("Ingest failed in state {}: {}: {}", ctx.state, err, cause),
            None => warn!("Ingest failed in state {}: {}", ctx.state, err),
        }
        progress.report(ProgressEvent::Failed {
            error: err.to_string(),
        });
        self.rollback(ctx);
        err
    }

    /// Deletes every row of the fresh group with its file, then sweeps.
    /// Best-effort: problems become warnings on the context.
    fn rollback(&self, ctx: &mut IngestContext) {
        let _span = info_span!("rollback", group_id = %ctx.group_id).entered();

        match self.delete_group_members(&ctx.group_id) {
            Ok(warnings) => ctx.warnings.extend(warnings),
            Err(e) => ctx.warnings.push(PipelineWarning::RollbackFailed {
                group_id: ctx.group_id.clone(),
                error: e.to_string(),
            }),
        }

        match self.sweep() {
            Ok(report) => ctx.warnings.extend(report.failures),
            Err(e) => ctx.warnings.push(PipelineWarning::RollbackFailed {
                group_id: ctx.group_id.clone(),
                error: e.to_string(),
            }),
        }
    }
}
