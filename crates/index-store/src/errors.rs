use moraine_db_types::DbError;
use moraine_primitives::BlockId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexStoreError {
    /// Rebuilding the index from scratch is an unsupported configuration.
    #[error("reindexing the block store from scratch is not supported")]
    ReindexUnsupported,

    /// A block referenced by the persisted chain is gone from the store, so
    /// the index cannot be recovered safely.
    #[error("stored block {0} missing while walking back to the chain")]
    MissingStoredBlock(BlockId),

    #[error("database: {0}")]
    Db(#[from] DbError),
}
