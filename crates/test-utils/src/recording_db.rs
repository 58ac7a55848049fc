use moraine_db_types::{traits::BlockStoreDatabase, DbResult};
use moraine_primitives::{BlockId, RawBlock};
use parking_lot::Mutex;

/// Wraps a database and records batch-level write activity, so tests can
/// assert on flush boundaries rather than just final contents.
#[derive(Debug)]
pub struct RecordingBlockStoreDb<D> {
    inner: D,
    put_batches: Mutex<Vec<usize>>,
    deleted: Mutex<Vec<BlockId>>,
}

impl<D: BlockStoreDatabase> RecordingBlockStoreDb<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            put_batches: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Block counts of every put batch, in write order.
    pub fn put_batch_sizes(&self) -> Vec<usize> {
        self.put_batches.lock().clone()
    }

    /// Every block id passed to a delete, in delete order.
    pub fn deleted_blkids(&self) -> Vec<BlockId> {
        self.deleted.lock().clone()
    }
}

impl<D: BlockStoreDatabase> BlockStoreDatabase for RecordingBlockStoreDb<D> {
    fn get_tip_blockid(&self) -> DbResult<Option<BlockId>> {
        self.inner.get_tip_blockid()
    }

    fn block_exists(&self, blkid: BlockId) -> DbResult<bool> {
        self.inner.block_exists(blkid)
    }

    fn get_block(&self, blkid: BlockId) -> DbResult<Option<RawBlock>> {
        self.inner.get_block(blkid)
    }

    fn put_blocks(&self, new_tip: BlockId, blocks: Vec<RawBlock>) -> DbResult<()> {
        self.put_batches.lock().push(blocks.len());
        self.inner.put_blocks(new_tip, blocks)
    }

    fn del_blocks(&self, new_tip: BlockId, blkids: Vec<BlockId>) -> DbResult<()> {
        self.deleted.lock().extend(blkids.iter().copied());
        self.inner.del_blocks(new_tip, blkids)
    }

    fn set_tx_index(&self, enabled: bool) -> DbResult<()> {
        self.inner.set_tx_index(enabled)
    }
}
