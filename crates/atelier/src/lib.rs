pub mod config;
pub mod db;
pub mod error;
pub mod pipeline;
pub mod processor;
pub mod response;
pub mod sanitize;
pub mod storage;

pub use config::{load_config, Config};
pub use db::Database;
pub use error::{
    AtelierError, ConfigError, ConversionError, NotFoundError, Result, StorageError,
    ThumbnailError,
};
pub use pipeline::{IngestError, Pipeline, PipelineConfig, Upload};
pub use response::{UrlBuilder, VisualResponse};
pub use storage::MediaStorage;
