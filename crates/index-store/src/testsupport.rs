//! Test-only collaborators for the sync engine.
//!
//! These in-memory [`HeaderChain`]/[`BlockFetcher`] implementations live in
//! the crate under test rather than in `moraine-test-utils`: test-utils would
//! otherwise have to depend on this crate, and the resulting dependency cycle
//! makes the unit-test build link two distinct copies of `moraine-index-store`
//! whose trait definitions no longer line up.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU32, Ordering},
};

use async_trait::async_trait;
use moraine_primitives::{BlockId, ChainEntry, RawBlock};
use parking_lot::{Mutex, RwLock};
use rand::RngCore;

use crate::traits::{BlockFetcher, HeaderChain};

fn random_body(len: usize) -> Vec<u8> {
    let mut body = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut body);
    body
}

/// Builds a linked chain of blocks starting from a genesis block with a zero
/// parent, with random bodies of the given length.
pub fn build_block_chain(len: usize, body_len: usize) -> Vec<RawBlock> {
    let mut blocks = Vec::with_capacity(len);
    let mut parent = BlockId::zero();
    for _ in 0..len {
        let block = RawBlock::build(parent, random_body(body_len));
        parent = block.blkid();
        blocks.push(block);
    }
    blocks
}

/// Derives header chain entries for a linked block sequence, assigning
/// heights from 0.
pub fn entries_for_blocks(blocks: &[RawBlock]) -> Vec<ChainEntry> {
    blocks
        .iter()
        .enumerate()
        .map(|(height, block)| {
            ChainEntry::new(height as u64, block.blkid(), *block.header().parent())
        })
        .collect()
}

/// Builds `len` new blocks forking off `blocks[fork_parent_height]`, with
/// fresh random bodies so their ids differ from any existing branch.
pub fn build_fork(blocks: &[RawBlock], fork_parent_height: u64, len: usize, body_len: usize) -> Vec<RawBlock> {
    let mut branch = Vec::with_capacity(len);
    let mut parent = blocks[fork_parent_height as usize].blkid();
    for _ in 0..len {
        let block = RawBlock::build(parent, random_body(body_len));
        parent = block.blkid();
        branch.push(block);
    }
    branch
}

/// In-memory header chain for tests. Height-addressable vector of entries
/// that can be swapped wholesale to simulate a reorg under a running engine.
#[derive(Debug)]
pub struct MemoryHeaderChain {
    entries: RwLock<Vec<ChainEntry>>,
}

impl MemoryHeaderChain {
    /// Entry heights must equal their index, starting from a height-0
    /// genesis.
    pub fn new(entries: Vec<ChainEntry>) -> Self {
        assert!(!entries.is_empty(), "chain requires a genesis entry");
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub fn from_blocks(blocks: &[RawBlock]) -> Self {
        Self::new(entries_for_blocks(blocks))
    }

    /// Replaces the whole chain, e.g. with a reorged variant.
    pub fn set_entries(&self, entries: Vec<ChainEntry>) {
        assert!(!entries.is_empty(), "chain requires a genesis entry");
        *self.entries.write() = entries;
    }

    pub fn tip_height(&self) -> u64 {
        (self.entries.read().len() - 1) as u64
    }
}

impl HeaderChain for MemoryHeaderChain {
    fn entry_at_height(&self, height: u64) -> Option<ChainEntry> {
        self.entries.read().get(height as usize).copied()
    }

    fn entry_by_blkid(&self, blkid: &BlockId) -> Option<ChainEntry> {
        self.entries
            .read()
            .iter()
            .find(|entry| entry.blkid() == blkid)
            .copied()
    }

    fn genesis(&self) -> ChainEntry {
        self.entries.read()[0]
    }
}

/// Fetcher stub serving a canned set of blocks. Each block becomes available
/// only after `polls_until_ready` misses; a fetcher built with
/// [`ScriptedFetcher::unavailable`] never produces anything.
#[derive(Debug)]
pub struct ScriptedFetcher {
    blocks: Mutex<HashMap<BlockId, RawBlock>>,
    polls_until_ready: u32,
    poll_counts: Mutex<HashMap<BlockId, u32>>,
    requested: Mutex<Vec<ChainEntry>>,
    total_polls: AtomicU32,
}

impl ScriptedFetcher {
    fn with_delay(blocks: impl IntoIterator<Item = RawBlock>, polls_until_ready: u32) -> Self {
        let blocks = blocks
            .into_iter()
            .map(|block| (block.blkid(), block))
            .collect();
        Self {
            blocks: Mutex::new(blocks),
            polls_until_ready,
            poll_counts: Mutex::new(HashMap::new()),
            requested: Mutex::new(Vec::new()),
            total_polls: AtomicU32::new(0),
        }
    }

    /// Fetcher whose blocks are available on the first poll.
    pub fn with_blocks(blocks: impl IntoIterator<Item = RawBlock>) -> Self {
        Self::with_delay(blocks, 0)
    }

    /// Fetcher whose blocks only turn up after a number of misses.
    pub fn delayed(blocks: impl IntoIterator<Item = RawBlock>, polls_until_ready: u32) -> Self {
        Self::with_delay(blocks, polls_until_ready)
    }

    /// Fetcher that never delivers anything.
    pub fn unavailable() -> Self {
        Self::with_delay([], 0)
    }

    pub fn add_block(&self, block: RawBlock) {
        self.blocks.lock().insert(block.blkid(), block);
    }

    /// Every entry a request was issued for, in order.
    pub fn requested(&self) -> Vec<ChainEntry> {
        self.requested.lock().clone()
    }

    pub fn total_polls(&self) -> u32 {
        self.total_polls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl BlockFetcher for ScriptedFetcher {
    async fn request_block(&self, entry: &ChainEntry) {
        self.requested.lock().push(*entry);
    }

    async fn poll_block(&self, entry: &ChainEntry) -> Option<RawBlock> {
        self.total_polls.fetch_add(1, Ordering::Relaxed);

        let polls = {
            let mut counts = self.poll_counts.lock();
            let count = counts.entry(*entry.blkid()).or_insert(0);
            *count += 1;
            *count
        };
        if polls <= self.polls_until_ready {
            return None;
        }

        self.blocks.lock().get(entry.blkid()).cloned()
    }
}
