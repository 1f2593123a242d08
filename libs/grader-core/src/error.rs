use thiserror::Error;

/// The sandbox could not run the submission at all.
///
/// A program that runs and fails is not an `ExecutionError`; it is an
/// `ExecutionResult` with a non-zero exit status.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("failed to spawn interpreter '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to prepare workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("source code exceeds maximum size of {limit} bytes")]
    SourceTooLarge { limit: usize },

    #[error("test input exceeds maximum size of {limit} bytes")]
    InputTooLarge { limit: usize },

    #[error("i/o error while running submission: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors returned by `Grader::grade` before any submission is persisted.
#[derive(Debug, Error)]
pub enum GradingError {
    #[error("{0}")]
    Validation(String),

    #[error("problem {0} not found")]
    NotFound(i64),

    #[error("problem {0} has no test cases")]
    NoTestCases(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T, E = GradingError> = std::result::Result<T, E>;
