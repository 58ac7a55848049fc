use std::collections::*;

use moraine_primitives::{BlockId, RawBlock};
use parking_lot::Mutex;

use crate::{traits::BlockStoreDatabase, DbError, DbResult};

/// In-memory block store. Batches are applied under one lock so writes are
/// atomic the way the trait demands, which is all the tests care about.
#[derive(Debug)]
pub struct StubBlockStoreDb {
    inner: Mutex<StubInner>,
}

#[derive(Debug, Default)]
struct StubInner {
    blocks: HashMap<BlockId, RawBlock>,
    tip: Option<BlockId>,
    tx_index: bool,
}

impl Default for StubBlockStoreDb {
    fn default() -> Self {
        Self::new()
    }
}

impl StubBlockStoreDb {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StubInner::default()),
        }
    }

    /// Number of blocks currently stored.
    pub fn len(&self) -> usize {
        self.inner.lock().blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().blocks.is_empty()
    }

    pub fn tx_index_enabled(&self) -> bool {
        self.inner.lock().tx_index
    }
}

impl BlockStoreDatabase for StubBlockStoreDb {
    fn get_tip_blockid(&self) -> DbResult<Option<BlockId>> {
        Ok(self.inner.lock().tip)
    }

    fn block_exists(&self, blkid: BlockId) -> DbResult<bool> {
        Ok(self.inner.lock().blocks.contains_key(&blkid))
    }

    fn get_block(&self, blkid: BlockId) -> DbResult<Option<RawBlock>> {
        Ok(self.inner.lock().blocks.get(&blkid).cloned())
    }

    fn put_blocks(&self, new_tip: BlockId, blocks: Vec<RawBlock>) -> DbResult<()> {
        if blocks.is_empty() {
            return Err(DbError::EmptyBatch);
        }

        let mut inner = self.inner.lock();
        for block in blocks {
            inner.blocks.insert(block.blkid(), block);
        }
        inner.tip = Some(new_tip);
        Ok(())
    }

    fn del_blocks(&self, new_tip: BlockId, blkids: Vec<BlockId>) -> DbResult<()> {
        let mut inner = self.inner.lock();
        for blkid in blkids {
            inner.blocks.remove(&blkid);
        }
        inner.tip = Some(new_tip);
        Ok(())
    }

    fn set_tx_index(&self, enabled: bool) -> DbResult<()> {
        self.inner.lock().tx_index = enabled;
        Ok(())
    }
}
