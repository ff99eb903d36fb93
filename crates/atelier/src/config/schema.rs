use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    pub media_root: String,
    #[serde(default = "default_media_url")]
    pub media_url: String,
    pub public_base_url: String,
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default = "default_visuals_directory")]
    pub visuals_directory: String,
    #[serde(default = "default_goals_directory")]
    pub goals_directory: String,
    #[serde(default)]
    pub thumbnails: ThumbnailConfig,
}

impl Config {
    /// Resolved database location: the configured path, or the per-user default.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database_path
            .as_ref()
            .map(PathBuf::from)
            .or_else(crate::db::default_database_path)
    }
}

fn default_media_url() -> String {
    "/media/".to_string()
}

fn default_visuals_directory() -> String {
    "commissions/files".to_string()
}

fn default_goals_directory() -> String {
    "goals/images".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    #[serde(default = "default_min_size")]
    pub min_size: u32,
    #[serde(default = "default_convert_extensions")]
    pub convert_extensions: Vec<String>,
    #[serde(default = "default_thumbnail_extensions")]
    pub thumbnail_extensions: Vec<String>,
}

fn default_min_size() -> u32 {
    256
}

fn default_convert_extensions() -> Vec<String> {
    vec!["png".to_string(), "jpg".to_string(), "jpeg".to_string()]
}

fn default_thumbnail_extensions() -> Vec<String> {
    vec![
        "png".to_string(),
        "jpg".to_string(),
        "jpeg".to_string(),
        "webp".to_string(),
    ]
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            min_size: default_min_size(),
            convert_extensions: default_convert_extensions(),
            thumbnail_extensions: default_thumbnail_extensions(),
        }
    }
}
