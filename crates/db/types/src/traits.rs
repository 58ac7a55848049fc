//! Trait definitions for low level database interfaces.

use moraine_primitives::{BlockId, RawBlock};

use crate::DbResult;

/// Database interface for the durable block index store.
///
/// Stores full blocks keyed by id and tracks a single "current tip" pointer.
/// Writes are batched and atomic: a put or delete either fully applies,
/// including the tip move, or not at all. Chain ordering is NOT VALIDATED at
/// this level; ensure all operations are done through `BlockStoreManager`.
pub trait BlockStoreDatabase: Send + Sync + 'static {
    /// Gets the current tip block id, or `None` on a fresh store that has
    /// never been written to.
    fn get_tip_blockid(&self) -> DbResult<Option<BlockId>>;

    /// Returns whether a block with the given id is present.
    fn block_exists(&self, blkid: BlockId) -> DbResult<bool>;

    /// Gets a stored block by its id, if we have it.
    fn get_block(&self, blkid: BlockId) -> DbResult<Option<RawBlock>>;

    /// Atomically inserts a batch of blocks and advances the tip pointer to
    /// `new_tip`. The batch is expected to be in height order and `new_tip`
    /// to be the id of its last block.
    fn put_blocks(&self, new_tip: BlockId, blocks: Vec<RawBlock>) -> DbResult<()>;

    /// Atomically deletes the given blocks and rolls the tip pointer back to
    /// `new_tip`. Used for reorg rollback and crash recovery.
    fn del_blocks(&self, new_tip: BlockId, blkids: Vec<BlockId>) -> DbResult<()>;

    /// Enables or disables the secondary transaction index. Idempotent.
    fn set_tx_index(&self, enabled: bool) -> DbResult<()>;
}
