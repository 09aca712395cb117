use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors surfaced to the caller of an analysis run.
///
/// Recoverable I/O and parse failures never show up here; they are counted
/// in the run statistics and the offending entry is skipped.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invalid project root: {0}")]
    InvalidRoot(String),

    #[error("Invariant violated: {0}")]
    Validation(#[from] ValidationError),

    #[error("Ignore pattern error: {0}")]
    Ignore(#[from] ignore::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// A pipeline invariant that did not hold.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("group `{group}` has no members")]
    EmptyGroup { group: String },

    #[error("file `{file}` is assigned to both `{first}` and `{second}`")]
    DuplicateAssignment {
        file: String,
        first: String,
        second: String,
    },

    #[error("file `{file}` was scanned but is not in any group")]
    UnassignedFile { file: String },

    #[error("mapping indices disagree on `{file}`: {detail}")]
    IndexMismatch { file: String, detail: String },
}
