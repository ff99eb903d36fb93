//! Builder for config files used by integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};

/// Builds the JSON form of a config file.
pub struct ConfigBuilder {
    media_root: String,
    public_base_url: String,
    database_path: Option<String>,
    visuals_directory: Option<String>,
    min_size: Option<u32>,
}

impl ConfigBuilder {
    pub fn new(media_root: &str) -> Self {
        Self {
            media_root: media_root.to_string(),
            public_base_url: "http://api.example.com".to_string(),
            database_path: None,
            visuals_directory: None,
            min_size: None,
        }
    }

    pub fn public_base_url(mut self, url: &str) -> Self {
        self.public_base_url = url.to_string();
        self
    }

    pub fn database_path(mut self, path: &str) -> Self {
        self.database_path = Some(path.to_string());
        self
    }

    pub fn visuals_directory(mut self, dir: &str) -> Self {
        self.visuals_directory = Some(dir.to_string());
        self
    }

    pub fn min_size(mut self, size: u32) -> Self {
        self.min_size = Some(size);
        self
    }

    pub fn build(self) -> Value {
        let mut config = json!({
            "version": "1.0",
            "media_root": self.media_root,
            "public_base_url": self.public_base_url,
        });
        if let Some(path) = self.database_path {
            config["database_path"] = json!(path);
        }
        if let Some(dir) = self.visuals_directory {
            config["visuals_directory"] = json!(dir);
        }
        if let Some(size) = self.min_size {
            config["thumbnails"] = json!({ "min_size": size });
        }
        config
    }
}
