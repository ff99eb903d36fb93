//! Test harness for isolated pipeline execution.
//!
//! The `TestHarness` owns a temporary media root, an in-memory database with
//! one commission, and a `Pipeline` wired to both.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use tempfile::TempDir;

use atelier::config::load_config_from_str;
use atelier::db::commission_repo::{self, NewCommission};
use atelier::db::visual_repo::{self, VisualAssetRow};
use atelier::pipeline::{IngestError, IngestOutcome, NoopProgress};
use atelier::{Config, Database, Pipeline, PipelineConfig, Upload, UrlBuilder};

use super::builders::ConfigBuilder;

pub struct TestHarness {
    temp_dir: TempDir,
    pub media_root: PathBuf,
    pub config: Config,
    pub pipeline: Pipeline,
    pub commission_id: i64,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(|builder| builder)
    }

    /// Builds the harness from a config adjusted by `configure`. The media
    /// root always points into the temp directory.
    pub fn with_config(configure: impl FnOnce(ConfigBuilder) -> ConfigBuilder) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let media_root = temp_dir.path().join("media");
        std::fs::create_dir_all(&media_root).expect("Failed to create media root");

        let builder = ConfigBuilder::new(media_root.to_str().expect("utf-8 temp path"));
        let config_json = configure(builder).build().to_string();
        let config = load_config_from_str(&config_json).expect("Failed to load test config");

        let db = Database::open_in_memory().expect("Failed to open test database");
        let commission = commission_repo::insert(&db, &NewCommission::titled("Full Body"))
            .expect("Failed to create commission");
        let pipeline = Pipeline::from_config(Arc::new(PipelineConfig::from_config(&config)), db)
            .expect("Failed to build pipeline");

        Self {
            temp_dir,
            media_root,
            config,
            pipeline,
            commission_id: commission.id,
        }
    }

    pub fn db(&self) -> &Database {
        self.pipeline.database()
    }

    pub fn urls(&self) -> UrlBuilder {
        UrlBuilder::from_config(&self.config)
    }

    /// PNG bytes of a solid image.
    pub fn png(width: u32, height: u32) -> Vec<u8> {
        encode(
            &image::DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([30, 60, 90]))),
            ImageFormat::Png,
        )
    }

    /// PNG bytes of a half-transparent image.
    pub fn png_with_alpha(width: u32, height: u32) -> Vec<u8> {
        encode(
            &image::DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                width,
                height,
                Rgba([30, 60, 90, 128]),
            )),
            ImageFormat::Png,
        )
    }

    pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
        encode(
            &image::DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 10, 10]))),
            ImageFormat::Jpeg,
        )
    }

    pub fn upload(&self, filename: &str, content: Vec<u8>) -> Upload {
        Upload::new(filename, content, self.commission_id)
    }

    pub fn ingest(&self, upload: Upload) -> Result<IngestOutcome, IngestError> {
        self.pipeline.ingest(upload, &NoopProgress)
    }

    pub fn group_rows(&self, group_id: &str) -> Vec<VisualAssetRow> {
        visual_repo::find_by_group(self.db(), group_id).expect("Failed to query group")
    }

    /// Absolute path of a stored file.
    pub fn media_path(&self, relative: &str) -> PathBuf {
        self.media_root.join(relative)
    }

    /// Filenames currently in the visuals directory.
    pub fn visual_files(&self) -> Vec<String> {
        self.files_in(&self.config.visuals_directory)
    }

    /// Filenames currently in `relative_dir` under the media root.
    pub fn files_in(&self, relative_dir: &str) -> Vec<String> {
        let dir = self.media_root.join(relative_dir);
        if !dir.exists() {
            return Vec::new();
        }
        let mut names: Vec<String> = std::fs::read_dir(&dir)
            .expect("Failed to list media directory")
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn write_visual(&self, name: &str, content: &[u8]) -> PathBuf {
        let dir = self.media_root.join(&self.config.visuals_directory);
        std::fs::create_dir_all(&dir).expect("Failed to create visuals directory");
        let path = dir.join(name);
        std::fs::write(&path, content).expect("Failed to write visual");
        path
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }
}

fn encode(img: &image::DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, format)
        .expect("Failed to encode fixture image");
    buffer.into_inner()
}
