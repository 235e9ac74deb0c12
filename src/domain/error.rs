// ============================================================
// Layer 3 - Pipeline Errors
// ============================================================
// Four kinds of failure, each with a fixed recovery policy:
//
//   MissingFile    → recovered: the index is skipped and logged
//   Configuration  → fatal, raised before training starts
//   Execution      → fatal, the engine step failed
//   Io             → fatal, a checkpoint/prediction/log write failed
//
// Higher layers wrap these in anyhow::Error with extra context;
// callers that care about the kind use downcast_ref.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("file does not exist: {path}")]
    MissingFile { path: PathBuf },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("execution engine failure: {0}")]
    Execution(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io { path: path.into(), source }
    }

    /// True for the one failure kind the pipeline recovers from.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PipelineError::MissingFile { .. })
    }
}
