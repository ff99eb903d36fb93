use std::path::PathBuf;

use crate::config::Config;

pub struct PipelineConfig {
    pub media_root: PathBuf,
    pub visuals_directory: String,
    pub goals_directory: String,
    pub min_thumbnail_size: u32,
    pub convert_extensions: Vec<String>,
    pub thumbnail_extensions: Vec<String>,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            media_root: PathBuf::from(&config.media_root),
            visuals_directory: config.visuals_directory.trim_end_matches('/').to_string(),
            goals_directory: config.goals_directory.trim_end_matches('/').to_string(),
            min_thumbnail_size: config.thumbnails.min_size,
            convert_extensions: lowercase_all(&config.thumbnails.convert_extensions),
            thumbnail_extensions: lowercase_all(&config.thumbnails.thumbnail_extensions),
        }
    }

    pub fn converts(&self, extension: &str) -> bool {
        self.convert_extensions.iter().any(|e| e == extension)
    }

    pub fn thumbnails(&self, extension: &str) -> bool {
        self.thumbnail_extensions.iter().any(|e| e == extension)
    }
}

fn lowercase_all(extensions: &[String]) -> Vec<String> {
    extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .collect()
}
