//! Buffer for blocks received before the index store asked for them.

use std::collections::HashMap;

use moraine_primitives::{BlockId, ChainEntry, RawBlock};
use parking_lot::Mutex;

use crate::traits::HeaderChain;

/// A block parked in the pending buffer together with its chain position.
#[derive(Clone, Debug)]
pub struct PendingBlock {
    entry: ChainEntry,
    block: RawBlock,
}

impl PendingBlock {
    pub fn new(entry: ChainEntry, block: RawBlock) -> Self {
        Self { entry, block }
    }

    pub fn entry(&self) -> &ChainEntry {
        &self.entry
    }

    pub fn block(&self) -> &RawBlock {
        &self.block
    }

    pub fn into_block(self) -> RawBlock {
        self.block
    }
}

/// Concurrent map of blocks received out-of-band (e.g. via gossip) before
/// the engine needed them, keyed by block id. An external notifier feeds it
/// and the engine drains it; each entry is removable exactly once.
#[derive(Debug, Default)]
pub struct PendingBlockBuffer {
    blocks: Mutex<HashMap<BlockId, PendingBlock>>,
}

impl PendingBlockBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts a block from the notifier if it sits on the best chain above
    /// the currently indexed height. Returns whether it was parked.
    pub fn accept_block(
        &self,
        chain: &impl HeaderChain,
        indexed_height: u64,
        block: RawBlock,
    ) -> bool {
        let Some(entry) = chain.entry_by_blkid(&block.blkid()) else {
            // Not on the best chain anymore, a reorg got it first.
            return false;
        };
        if entry.height() <= indexed_height {
            return false;
        }

        self.insert(PendingBlock::new(entry, block));
        true
    }

    pub fn insert(&self, pending: PendingBlock) {
        self.blocks
            .lock()
            .insert(*pending.entry().blkid(), pending);
    }

    /// Atomically removes and returns the entry for `blkid`. At most one
    /// caller wins this for any given entry.
    pub fn try_remove(&self, blkid: &BlockId) -> Option<PendingBlock> {
        self.blocks.lock().remove(blkid)
    }

    pub fn contains(&self, blkid: &BlockId) -> bool {
        self.blocks.lock().contains_key(blkid)
    }

    /// Number of parked blocks. Approximate from any single caller's
    /// perspective, since producers and consumers race.
    pub fn approx_len(&self) -> usize {
        self.blocks.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::{build_block_chain, MemoryHeaderChain};

    #[test]
    fn test_entry_removed_exactly_once() {
        let blocks = build_block_chain(2, 32);
        let chain = MemoryHeaderChain::from_blocks(&blocks);
        let buffer = PendingBlockBuffer::new();

        assert!(buffer.accept_block(&chain, 0, blocks[1].clone()));
        let blkid = blocks[1].blkid();
        assert!(buffer.contains(&blkid));

        assert!(buffer.try_remove(&blkid).is_some());
        assert!(buffer.try_remove(&blkid).is_none());
        assert!(!buffer.contains(&blkid));
        assert_eq!(buffer.approx_len(), 0);
    }

    #[test]
    fn test_accept_rejects_off_chain_blocks() {
        let blocks = build_block_chain(2, 32);
        let chain = MemoryHeaderChain::from_blocks(&blocks);
        let buffer = PendingBlockBuffer::new();

        let stranger = RawBlock::build(blocks[1].blkid(), vec![0xaa; 32]);
        assert!(!buffer.accept_block(&chain, 0, stranger));
        assert_eq!(buffer.approx_len(), 0);
    }

    #[test]
    fn test_accept_rejects_already_indexed_heights() {
        let blocks = build_block_chain(3, 32);
        let chain = MemoryHeaderChain::from_blocks(&blocks);
        let buffer = PendingBlockBuffer::new();

        assert!(!buffer.accept_block(&chain, 1, blocks[1].clone()));
        assert!(buffer.accept_block(&chain, 1, blocks[2].clone()));
    }
}
