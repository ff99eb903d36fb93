pub mod cleanup;
pub mod config;
pub mod context;
pub mod error;
pub mod goals;
pub mod progress;
pub mod runner;

pub use cleanup::{DeleteReport, SweepReport};
pub use config::PipelineConfig;
pub use context::{IngestContext, IngestOutcome, Upload};
pub use error::{CleanupError, IngestError, PipelineWarning, StageError};
pub use progress::{AssetState, LogProgress, NoopProgress, ProgressEvent, ProgressReporter};
pub use runner::Pipeline;
