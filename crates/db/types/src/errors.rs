use moraine_primitives::BlockId;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum DbError {
    #[error("missing block body (id {0})")]
    MissingBlockBody(BlockId),

    #[error("tried to write an empty block batch")]
    EmptyBatch,

    #[error("IO Error: {0}")]
    IoError(String),

    #[error("operation timed out")]
    TimedOut,

    /// A database worker task failed in a way that could not be determined.
    #[error("worker task exited strangely")]
    WorkerFailedStrangely,

    #[error("{0}")]
    Other(String),
}
