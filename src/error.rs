//! Error types for the mobikin pipeline

use thiserror::Error;

/// Errors that can occur while processing a session.
///
/// Every variant is unrecoverable for the invocation that produced it:
/// the pipeline never retries and never emits partial output.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required column is missing or renamed (ERR_SCHEMA)
    #[error("Input schema mismatch: missing column(s) {0}")]
    Schema(String),

    /// A field failed to parse (ERR_PARSE)
    #[error("Failed to parse input: {0}")]
    Parse(String),

    /// The input contained zero data rows (ERR_EMPTY_INPUT)
    #[error("Input contains no data rows")]
    EmptyInput,

    /// Model or feature-list artifact missing or corrupt (ERR_ARTIFACT_LOAD)
    #[error("Failed to load classifier artifact: {0}")]
    ArtifactLoad(String),

    /// Feature list references a column the extractor never computes (ERR_ARTIFACT_MISMATCH)
    #[error("Classifier feature list references unknown feature(s): {0}")]
    ArtifactMismatch(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Stable machine-readable error code, used by the CLI error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Schema(_) => "ERR_SCHEMA",
            PipelineError::Parse(_) => "ERR_PARSE",
            PipelineError::EmptyInput => "ERR_EMPTY_INPUT",
            PipelineError::ArtifactLoad(_) => "ERR_ARTIFACT_LOAD",
            PipelineError::ArtifactMismatch(_) => "ERR_ARTIFACT_MISMATCH",
            PipelineError::Csv(_) => "ERR_PARSE",
            PipelineError::Json(_) => "ERR_ARTIFACT_LOAD",
        }
    }
}
