//! Storage managers for the moraine node.

mod cache;
pub mod exec;
mod managers;
pub mod ops;

use std::sync::Arc;

pub use managers::block_store::BlockStoreManager;
use moraine_db_types::traits::BlockStoreDatabase;

/// A consolidation of database managers.
#[derive(Clone)]
#[expect(
    missing_debug_implementations,
    reason = "manager types don't have Debug implementations"
)]
pub struct NodeStorage {
    block_store_manager: Arc<BlockStoreManager>,
}

impl NodeStorage {
    pub fn block_store(&self) -> &Arc<BlockStoreManager> {
        &self.block_store_manager
    }
}

/// Given a raw database, creates storage managers and returns a
/// [`NodeStorage`] instance around the underlying raw database.
pub fn create_node_storage<D>(db: Arc<D>, pool: threadpool::ThreadPool) -> NodeStorage
where
    D: BlockStoreDatabase + 'static,
{
    let block_store_manager = Arc::new(BlockStoreManager::new(pool, db));

    NodeStorage {
        block_store_manager,
    }
}
