//! Interfaces of the engine's external collaborators.

use async_trait::async_trait;
use moraine_primitives::{BlockId, ChainEntry, RawBlock};

/// Read-only, ordered view of the node's best-known header chain.
pub trait HeaderChain: Send + Sync + 'static {
    /// Entry of the best chain at the given height, if the chain extends
    /// that far.
    fn entry_at_height(&self, height: u64) -> Option<ChainEntry>;

    /// Entry for the given block id, if it is on the best chain.
    fn entry_by_blkid(&self, blkid: &BlockId) -> Option<ChainEntry>;

    /// The chain's genesis anchor.
    fn genesis(&self) -> ChainEntry;
}

/// Request/response interface to the network block fetch subsystem. Peer
/// selection and retry policy live behind this boundary.
#[async_trait]
pub trait BlockFetcher: Send + Sync + 'static {
    /// Asks the fetch subsystem to start retrieving the block at `entry`.
    async fn request_block(&self, entry: &ChainEntry);

    /// Polls for a previously requested block. Returns `None` while the
    /// fetch is still outstanding.
    async fn poll_block(&self, entry: &ChainEntry) -> Option<RawBlock>;
}
