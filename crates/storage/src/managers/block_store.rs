use std::sync::Arc;

use moraine_db_types::{traits::BlockStoreDatabase, DbResult};
use moraine_primitives::{BlockId, RawBlock};
use threadpool::ThreadPool;

use crate::{cache::CacheTable, ops};

/// Caching manager of block store data.
#[expect(
    missing_debug_implementations,
    reason = "inner ops type doesn't have a Debug implementation"
)]
pub struct BlockStoreManager {
    ops: ops::block_store::BlockStoreOps,
    block_cache: CacheTable<BlockId, Option<RawBlock>>,
}

impl BlockStoreManager {
    /// Create new instance of [`BlockStoreManager`]
    pub fn new(pool: ThreadPool, db: Arc<impl BlockStoreDatabase + 'static>) -> Self {
        let ops = ops::block_store::Context::new(db).into_ops(pool);
        let block_cache = CacheTable::new(64.try_into().unwrap());
        Self { ops, block_cache }
    }

    /// Get the tip block id recorded by the store, `None` on a fresh store.
    pub fn get_tip_blockid(&self) -> DbResult<Option<BlockId>> {
        self.ops.get_tip_blockid_blocking()
    }

    /// Get the tip block id recorded by the store, `None` on a fresh store.
    pub async fn get_tip_blockid_async(&self) -> DbResult<Option<BlockId>> {
        self.ops.get_tip_blockid_async().await
    }

    pub fn block_exists(&self, blkid: BlockId) -> DbResult<bool> {
        self.ops.block_exists_blocking(blkid)
    }

    pub async fn block_exists_async(&self, blkid: BlockId) -> DbResult<bool> {
        self.ops.block_exists_async(blkid).await
    }

    /// Get a stored block by its id.
    pub fn get_block(&self, blkid: &BlockId) -> DbResult<Option<RawBlock>> {
        self.block_cache
            .get_or_fetch_blocking(blkid, || self.ops.get_block_blocking(*blkid))
    }

    /// Get a stored block by its id.
    pub async fn get_block_async(&self, blkid: &BlockId) -> DbResult<Option<RawBlock>> {
        self.block_cache
            .get_or_fetch(blkid, || self.ops.get_block_chan(*blkid))
            .await
    }

    /// Atomically write a height-ordered batch of blocks and advance the
    /// store tip to `new_tip`.
    pub fn put_blocks(&self, new_tip: BlockId, blocks: Vec<RawBlock>) -> DbResult<()> {
        for block in &blocks {
            self.block_cache.purge_blocking(&block.blkid());
        }
        self.ops.put_blocks_blocking(new_tip, blocks)
    }

    /// Atomically write a height-ordered batch of blocks and advance the
    /// store tip to `new_tip`.
    pub async fn put_blocks_async(&self, new_tip: BlockId, blocks: Vec<RawBlock>) -> DbResult<()> {
        for block in &blocks {
            self.block_cache.purge_async(&block.blkid()).await;
        }
        self.ops.put_blocks_async(new_tip, blocks).await
    }

    /// Atomically delete blocks and roll the store tip back to `new_tip`.
    pub fn del_blocks(&self, new_tip: BlockId, blkids: Vec<BlockId>) -> DbResult<()> {
        for blkid in &blkids {
            self.block_cache.purge_blocking(blkid);
        }
        self.ops.del_blocks_blocking(new_tip, blkids)
    }

    /// Atomically delete blocks and roll the store tip back to `new_tip`.
    pub async fn del_blocks_async(&self, new_tip: BlockId, blkids: Vec<BlockId>) -> DbResult<()> {
        for blkid in &blkids {
            self.block_cache.purge_async(blkid).await;
        }
        self.ops.del_blocks_async(new_tip, blkids).await
    }

    pub fn set_tx_index(&self, enabled: bool) -> DbResult<()> {
        self.ops.set_tx_index_blocking(enabled)
    }

    pub async fn set_tx_index_async(&self, enabled: bool) -> DbResult<()> {
        self.ops.set_tx_index_async(enabled).await
    }
}
