//! Block index store worker task.
//!
//! The worker owns the sync tip, the single position known to be durably
//! written. Every tick it either catches the index up toward the validated
//! chain tip (draining the pending buffer or downloading missing bodies in
//! height-ordered, size-bounded batches) or unwinds the index when the best
//! chain has reorganized away from the sync path.

use std::{collections::VecDeque, mem, sync::Arc, time::Duration};

use moraine_primitives::{BlockId, ChainEntry, RawBlock};
use moraine_status::StatusChannel;
use moraine_storage::{BlockStoreManager, NodeStorage};
use moraine_tasks::{shutdown_signal, ShutdownGuard};
use tracing::*;

use crate::{
    errors::IndexStoreError,
    params::IndexParams,
    pending::PendingBlockBuffer,
    traits::{BlockFetcher, HeaderChain},
};

/// Control decision after a pipeline finishes: keep working through this
/// tick, or end it and wait for the next one.
enum TickFlow {
    Continue,
    Stop,
}

/// Mutable worker state for the index store task.
///
/// Unable to be shared across threads. Anything we want to export goes
/// through the status channel.
#[expect(
    missing_debug_implementations,
    reason = "collaborator handles don't have Debug implementations"
)]
pub struct WorkerState<C, F> {
    chain: Arc<C>,
    fetcher: Arc<F>,
    storage: Arc<NodeStorage>,
    pending: Arc<PendingBlockBuffer>,
    status: StatusChannel,
    params: IndexParams,

    /// The last position durably written to the store. Moves forward on a
    /// committed batch and backward on a rollback, never sideways.
    tip: ChainEntry,
}

impl<C: HeaderChain, F: BlockFetcher> WorkerState<C, F> {
    /// Establishes a consistent sync tip from the store and chain before any
    /// ticking begins, recovering from a crashed run if needed.
    pub async fn open(
        chain: Arc<C>,
        fetcher: Arc<F>,
        storage: Arc<NodeStorage>,
        pending: Arc<PendingBlockBuffer>,
        status: StatusChannel,
        params: IndexParams,
    ) -> Result<Self, IndexStoreError> {
        if params.reindex {
            return Err(IndexStoreError::ReindexUnsupported);
        }

        let block_store = storage.block_store().clone();

        let tip = match block_store.get_tip_blockid_async().await? {
            // Fresh store, start indexing from the chain's genesis anchor.
            None => chain.genesis(),
            Some(tip_blkid) => match chain.entry_by_blkid(&tip_blkid) {
                Some(entry) => entry,
                None => recover_stored_tip(chain.as_ref(), &block_store, tip_blkid).await?,
            },
        };

        block_store.set_tx_index_async(true).await?;
        status.update_indexed_tip(tip.commitment());

        Ok(Self {
            chain,
            fetcher,
            storage,
            pending,
            status,
            params,
            tip,
        })
    }

    /// The last position durably written to the store.
    pub fn tip(&self) -> &ChainEntry {
        &self.tip
    }

    pub fn params(&self) -> &IndexParams {
        &self.params
    }

    /// Runs one synchronization pass, making as much progress toward the
    /// validated chain tip as this tick allows.
    pub async fn tick(&mut self, shutdown: &ShutdownGuard) -> Result<(), IndexStoreError> {
        self.run(shutdown, false).await
    }

    /// Best-effort drain of already-received pending blocks, issuing no new
    /// downloads and no rollbacks. Called once during shutdown.
    pub async fn flush(&mut self) -> Result<(), IndexStoreError> {
        let (_signal, guard) = shutdown_signal();
        self.run(&guard, true).await
    }

    async fn run(
        &mut self,
        shutdown: &ShutdownGuard,
        flush_only: bool,
    ) -> Result<(), IndexStoreError> {
        while !shutdown.should_shutdown() {
            // An unknown validated height means the chain has no validated
            // work for us; never guess a default.
            let Some(validated_height) = self.status.validated_height() else {
                break;
            };
            if self.tip.height() >= validated_height {
                break;
            }

            // Chain hasn't extended past our tip yet.
            let Some(next) = self.chain.entry_at_height(self.tip.height() + 1) else {
                break;
            };

            // The chain stopped extending our tip, so it must have reorged.
            if next.parent() != self.tip.blkid() {
                if flush_only {
                    break;
                }
                self.rollback_to_chain().await?;
                break;
            }

            // Another indexer path already stored the next block; catch the
            // tip up without any I/O.
            if self
                .storage
                .block_store()
                .block_exists_async(*next.blkid())
                .await?
            {
                self.set_tip(next);
                continue;
            }

            if self.pending.contains(next.blkid()) {
                match self.drain_pending(next, shutdown, flush_only).await? {
                    TickFlow::Continue => continue,
                    TickFlow::Stop => break,
                }
            }

            if flush_only {
                break;
            }

            match self.download(next, shutdown).await? {
                TickFlow::Continue => continue,
                TickFlow::Stop => break,
            }
        }

        Ok(())
    }

    /// Consumes blocks the pending buffer already holds, extending forward
    /// from `first` in height order and flushing size-bounded batches.
    async fn drain_pending(
        &mut self,
        first: ChainEntry,
        shutdown: &ShutdownGuard,
        flush_only: bool,
    ) -> Result<TickFlow, IndexStoreError> {
        // During bulk sync wait for the buffer to fill up so we issue fewer,
        // larger writes.
        if self.status.is_catching_up()
            && !flush_only
            && self.pending.approx_len() < self.params.pending_trigger
        {
            return Ok(TickFlow::Stop);
        }

        let Some(first_pending) = self.pending.try_remove(first.blkid()) else {
            // Lost the removal race to another consumer, so it's not
            // actually pending. Retry next tick.
            return Ok(TickFlow::Stop);
        };

        let mut batch_bytes = first_pending.block().serialized_size();
        let mut batch = vec![first_pending];
        let mut best = first;
        let mut cur = first;

        while !shutdown.should_shutdown() {
            // Stop extending once the chain ends, the link breaks, we pass
            // the validated tip, or the following block isn't pending.
            let mut stop = true;
            if let Some(next) = self.chain.entry_at_height(cur.height() + 1) {
                if next.parent() == cur.blkid() && self.within_validated(next.height()) {
                    if let Some(pending) = self.pending.try_remove(next.blkid()) {
                        batch_bytes += pending.block().serialized_size();
                        batch.push(pending);
                        best = next;
                        cur = next;
                        stop = false;
                    }
                }
            }

            if stop && batch.is_empty() {
                break;
            }

            if batch_bytes > self.params.batch_size_bytes || stop {
                let blocks = batch.drain(..).map(|p| p.into_block()).collect();
                self.commit_batch(best, blocks, batch_bytes).await?;

                if stop {
                    break;
                }
                batch_bytes = 0;

                // Writing flat out during bulk sync can outrun consumers of
                // freshly indexed data.
                if self.status.is_catching_up() {
                    pause(self.params.catchup_pacing, shutdown).await;
                }
            }
        }

        Ok(TickFlow::Continue)
    }

    /// Downloads blocks not known locally, in height order: keep the fetcher
    /// request queue topped up while polling its head, and persist arrivals
    /// in size-bounded batches.
    async fn download(
        &mut self,
        first: ChainEntry,
        shutdown: &ShutdownGuard,
    ) -> Result<TickFlow, IndexStoreError> {
        let mut batch: Vec<RawBlock> = Vec::new();
        let mut queue = VecDeque::new();

        self.fetcher.request_block(&first).await;
        queue.push_back(first);

        let mut cur = first;
        let mut batch_bytes: u64 = 0;
        let mut stalls: u32 = 0;
        let mut requesting = true;

        while !shutdown.should_shutdown() {
            if requesting {
                // Stop requesting once the chain ends, the link breaks, we
                // pass the validated tip, or the block is already pending or
                // stored.
                let mut stop = true;
                if let Some(next) = self.chain.entry_at_height(cur.height() + 1) {
                    if next.parent() == cur.blkid()
                        && self.within_validated(next.height())
                        && !self.pending.contains(next.blkid())
                        && !self
                            .storage
                            .block_store()
                            .block_exists_async(*next.blkid())
                            .await?
                    {
                        self.fetcher.request_block(&next).await;
                        queue.push_back(next);
                        cur = next;
                        stop = false;

                        if queue.len() >= self.params.download_queue_depth {
                            requesting = false;
                        }
                    }
                }

                if stop {
                    if queue.is_empty() {
                        break;
                    }
                    // Nothing more to ask for; drain what's in flight.
                    requesting = false;
                }
            }

            let Some(head) = queue.front().copied() else {
                break;
            };

            match self.fetcher.poll_block(&head).await {
                Some(block) => {
                    queue.pop_front();
                    batch_bytes += block.serialized_size();
                    batch.push(block);
                    stalls = 0;

                    // This can overshoot the threshold by one block.
                    if batch_bytes > self.params.batch_size_bytes || queue.is_empty() {
                        let blocks = mem::take(&mut batch);
                        self.commit_batch(head, blocks, batch_bytes).await?;
                        batch_bytes = 0;

                        if queue.is_empty() {
                            break;
                        }
                    }
                }
                None => {
                    // A block stalled or got lost in the fetcher; abandon
                    // this tick after a threshold so the next scheduled tick
                    // starts over.
                    if stalls > self.params.stall_abort_limit {
                        warn!(height = head.height(), blkid = %head.blkid(), "block fetch stalled, abandoning tick");
                        return Ok(TickFlow::Stop);
                    }

                    pause(self.params.stall_retry, shutdown).await;
                    stalls += 1;
                }
            }
        }

        Ok(TickFlow::Continue)
    }

    /// Unwinds the index back to the closest ancestor still on the best
    /// chain after a reorg.
    async fn rollback_to_chain(&mut self) -> Result<(), IndexStoreError> {
        let (ancestor, stale) = walk_back_to_chain(
            self.chain.as_ref(),
            self.storage.block_store(),
            *self.tip.blkid(),
        )
        .await?;

        let removed = stale.len();
        self.storage
            .block_store()
            .del_blocks_async(*ancestor.blkid(), stale)
            .await?;
        warn!(
            height = ancestor.height(),
            blkid = %ancestor.blkid(),
            removed,
            "chain reorganized, rolled block index back to ancestor"
        );

        self.set_tip(ancestor);
        Ok(())
    }

    /// Writes a height-ordered batch ending at `best` and advances the tip.
    async fn commit_batch(
        &mut self,
        best: ChainEntry,
        blocks: Vec<RawBlock>,
        total_bytes: u64,
    ) -> Result<(), IndexStoreError> {
        let count = blocks.len();
        self.storage
            .block_store()
            .put_blocks_async(*best.blkid(), blocks)
            .await?;
        self.set_tip(best);

        debug!(
            height = best.height(),
            blkid = %best.blkid(),
            blocks = count,
            bytes = total_bytes,
            "flushed block batch to store"
        );
        Ok(())
    }

    fn set_tip(&mut self, entry: ChainEntry) {
        self.tip = entry;
        self.status.update_indexed_tip(entry.commitment());
    }

    /// Whether a height is at or below the validated tip. An unknown
    /// validated height means there is no validated work to index.
    fn within_validated(&self, height: u64) -> bool {
        self.status
            .validated_height()
            .is_some_and(|validated| height <= validated)
    }
}

/// The store tip isn't on the best chain, which happens when a prior run
/// crashed partway through a reorg. Walks the persisted chain back to a
/// header the chain recognizes and deletes everything above it.
async fn recover_stored_tip<C: HeaderChain>(
    chain: &C,
    block_store: &BlockStoreManager,
    tip_blkid: BlockId,
) -> Result<ChainEntry, IndexStoreError> {
    let (ancestor, stale) = walk_back_to_chain(chain, block_store, tip_blkid).await?;

    let removed = stale.len();
    block_store
        .del_blocks_async(*ancestor.blkid(), stale)
        .await?;
    warn!(
        height = ancestor.height(),
        blkid = %ancestor.blkid(),
        removed,
        "recovered block index to chain ancestor"
    );

    Ok(ancestor)
}

/// Walks back from a stored block along parent links until a header the
/// chain recognizes, collecting the stale block ids on the way. Iterative,
/// since forks can in principle be arbitrarily deep.
async fn walk_back_to_chain<C: HeaderChain>(
    chain: &C,
    block_store: &BlockStoreManager,
    start: BlockId,
) -> Result<(ChainEntry, Vec<BlockId>), IndexStoreError> {
    let mut stale = Vec::new();
    let mut cur = start;

    loop {
        if let Some(entry) = chain.entry_by_blkid(&cur) {
            return Ok((entry, stale));
        }

        let Some(block) = block_store.get_block_async(&cur).await? else {
            // The persisted chain is broken; there is no safe way to keep
            // going.
            return Err(IndexStoreError::MissingStoredBlock(cur));
        };
        stale.push(cur);
        cur = *block.header().parent();
    }
}

/// Sleeps for the duration, returning early on shutdown.
async fn pause(dur: Duration, shutdown: &ShutdownGuard) {
    tokio::select! {
        _ = tokio::time::sleep(dur) => {}
        _ = shutdown.wait_for_shutdown() => {}
    }
}

/// The main task that keeps the block index synchronized with the chain.
/// Applies the startup delay, then ticks at a fixed interval until shutdown.
pub async fn index_store_task<C: HeaderChain, F: BlockFetcher>(
    mut state: WorkerState<C, F>,
    shutdown: ShutdownGuard,
) -> anyhow::Result<()> {
    let startup_delay = state.params.startup_delay;
    let poll_interval = state.params.poll_interval;

    info!(tip = %state.tip().commitment(), "started index store task");
    pause(startup_delay, &shutdown).await;

    while !shutdown.should_shutdown() {
        state.tick(&shutdown).await?;
        pause(poll_interval, &shutdown).await;
    }

    info!("index store task exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use moraine_db_types::{stubs::StubBlockStoreDb, traits::BlockStoreDatabase};
    use moraine_storage::create_node_storage;
    use moraine_test_utils::RecordingBlockStoreDb;

    use super::*;
    use crate::pending::PendingBlock;
    use crate::testsupport::{
        build_block_chain, build_fork, entries_for_blocks, MemoryHeaderChain, ScriptedFetcher,
    };

    type TestDb = RecordingBlockStoreDb<StubBlockStoreDb>;
    type TestWorker = WorkerState<MemoryHeaderChain, ScriptedFetcher>;

    struct Harness {
        chain: Arc<MemoryHeaderChain>,
        fetcher: Arc<ScriptedFetcher>,
        db: Arc<TestDb>,
        storage: Arc<NodeStorage>,
        pending: Arc<PendingBlockBuffer>,
        status: StatusChannel,
        params: IndexParams,
        blocks: Vec<RawBlock>,
    }

    /// Sets up a linked chain of `chain_len` blocks (genesis included), a
    /// fetcher that can serve all of them, and an empty store.
    fn harness(chain_len: usize, body_len: usize) -> Harness {
        let blocks = build_block_chain(chain_len, body_len);
        let chain = Arc::new(MemoryHeaderChain::from_blocks(&blocks));
        let fetcher = Arc::new(ScriptedFetcher::with_blocks(blocks.iter().cloned()));
        let db = Arc::new(RecordingBlockStoreDb::new(StubBlockStoreDb::new()));
        let storage = Arc::new(create_node_storage(db.clone(), threadpool::ThreadPool::new(2)));
        let status = StatusChannel::default();
        status.set_catching_up(false);

        Harness {
            chain,
            fetcher,
            db,
            storage,
            pending: Arc::new(PendingBlockBuffer::new()),
            status,
            params: IndexParams::default(),
            blocks,
        }
    }

    impl Harness {
        fn entry(&self, height: u64) -> ChainEntry {
            self.chain.entry_at_height(height).expect("entry at height")
        }

        fn set_validated(&self, height: u64) {
            self.status
                .update_validated_tip(self.entry(height).commitment());
        }

        fn park_pending(&self, height: u64) {
            let block = self.blocks[height as usize].clone();
            self.pending
                .insert(PendingBlock::new(self.entry(height), block));
        }

        async fn open(&self) -> Result<TestWorker, IndexStoreError> {
            WorkerState::open(
                self.chain.clone(),
                self.fetcher.clone(),
                self.storage.clone(),
                self.pending.clone(),
                self.status.clone(),
                self.params,
            )
            .await
        }

        async fn opened(&self) -> TestWorker {
            self.open().await.expect("open worker state")
        }

        fn store_tip(&self) -> Option<BlockId> {
            self.db.get_tip_blockid().expect("read store tip")
        }
    }

    async fn tick(state: &mut TestWorker) {
        let (_signal, guard) = shutdown_signal();
        state.tick(&guard).await.expect("tick");
    }

    #[tokio::test]
    async fn test_open_rejects_reindex() {
        let mut h = harness(2, 64);
        h.params.reindex = true;

        let res = h.open().await;
        assert!(matches!(res, Err(IndexStoreError::ReindexUnsupported)));
    }

    #[tokio::test]
    async fn test_open_fresh_store_starts_at_genesis() {
        let h = harness(3, 64);
        let state = h.opened().await;

        assert_eq!(*state.tip(), h.entry(0));
        assert_eq!(
            h.status.indexed_tip(),
            Some(h.entry(0).commitment()),
            "genesis should be published as the highest indexed block"
        );
        assert!(h.db.inner().tx_index_enabled());
        // the store tip pointer is untouched until the first write
        assert_eq!(h.store_tip(), None);
    }

    #[tokio::test]
    async fn test_open_recovers_crashed_store() {
        let h = harness(3, 64);

        // A stale branch of depth 3 on top of the chain's tip block, left
        // behind by a crash mid-reorg.
        let stale = build_fork(&h.blocks, 2, 3, 64);
        let stale_tip = stale[2].blkid();
        h.db.put_blocks(stale_tip, stale.clone()).unwrap();

        let state = h.opened().await;

        assert_eq!(*state.tip(), h.entry(2));
        assert_eq!(h.store_tip(), Some(*h.entry(2).blkid()));
        assert_eq!(
            h.db.deleted_blkids(),
            vec![stale[2].blkid(), stale[1].blkid(), stale[0].blkid()],
        );
        for block in &stale {
            assert!(!h.db.block_exists(block.blkid()).unwrap());
        }
    }

    #[tokio::test]
    async fn test_open_recovery_missing_block_is_fatal() {
        let h = harness(3, 64);

        // Store only the branch tip; its predecessor is gone.
        let stale = build_fork(&h.blocks, 2, 3, 64);
        h.db.put_blocks(stale[2].blkid(), vec![stale[2].clone()])
            .unwrap();

        let res = h.open().await;
        let missing = stale[1].blkid();
        assert!(matches!(
            res,
            Err(IndexStoreError::MissingStoredBlock(id)) if id == missing
        ));
    }

    #[tokio::test]
    async fn test_tick_noop_when_caught_up() {
        let h = harness(3, 64);
        h.set_validated(0);
        let mut state = h.opened().await;

        tick(&mut state).await;

        assert!(h.db.put_batch_sizes().is_empty());
        assert!(h.fetcher.requested().is_empty());
        assert_eq!(*state.tip(), h.entry(0));
    }

    #[tokio::test]
    async fn test_tick_stops_without_validated_height() {
        let h = harness(3, 64);
        let mut state = h.opened().await;

        tick(&mut state).await;

        assert!(h.db.put_batch_sizes().is_empty());
        assert!(h.fetcher.requested().is_empty());
    }

    #[tokio::test]
    async fn test_download_advances_to_validated_tip() {
        let h = harness(5, 64);
        h.set_validated(4);
        let mut state = h.opened().await;

        tick(&mut state).await;

        assert_eq!(*state.tip(), h.entry(4));
        assert_eq!(h.store_tip(), Some(*h.entry(4).blkid()));
        assert_eq!(h.status.indexed_tip(), Some(h.entry(4).commitment()));
        for height in 1..=4 {
            assert!(h.db.block_exists(h.blocks[height].blkid()).unwrap());
        }
        // small bodies all fit in one flush
        assert_eq!(h.db.put_batch_sizes(), vec![4]);

        let requested: Vec<u64> = h.fetcher.requested().iter().map(|e| e.height()).collect();
        assert_eq!(requested, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_download_flushes_on_batch_threshold() {
        // Three 2mb blocks against the 5mb threshold: the flush lands after
        // the third block, not the second.
        let h = harness(4, 2_000_000);
        h.set_validated(3);
        let mut state = h.opened().await;

        tick(&mut state).await;

        assert_eq!(h.db.put_batch_sizes(), vec![3]);
        assert_eq!(h.store_tip(), Some(*h.entry(3).blkid()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_stall_aborts_tick() {
        let mut h = harness(3, 64);
        h.fetcher = Arc::new(ScriptedFetcher::unavailable());
        h.params.stall_abort_limit = 3;
        h.set_validated(2);
        let mut state = h.opened().await;

        tick(&mut state).await;

        // One poll per retry delay plus the final over-limit one.
        assert_eq!(h.fetcher.total_polls(), h.params.stall_abort_limit + 2);
        assert!(h.db.put_batch_sizes().is_empty());
        assert_eq!(*state.tip(), h.entry(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_retries_misses_below_stall_limit() {
        let mut h = harness(3, 64);
        // Every block needs two misses before it turns up.
        h.fetcher = Arc::new(ScriptedFetcher::delayed(h.blocks.iter().cloned(), 2));
        h.set_validated(2);
        let mut state = h.opened().await;

        tick(&mut state).await;

        assert_eq!(*state.tip(), h.entry(2));
        assert_eq!(h.db.put_batch_sizes(), vec![2]);
        assert!(h.fetcher.total_polls() > 4);
    }

    #[tokio::test]
    async fn test_pending_drain_flushes_on_batch_threshold() {
        let mut h = harness(4, 2_000_000);
        h.fetcher = Arc::new(ScriptedFetcher::unavailable());
        h.set_validated(3);
        for height in 1..=3 {
            h.park_pending(height);
        }
        let mut state = h.opened().await;

        tick(&mut state).await;

        assert_eq!(h.db.put_batch_sizes(), vec![3]);
        assert_eq!(*state.tip(), h.entry(3));
        assert!(h.fetcher.requested().is_empty());
        assert_eq!(h.pending.approx_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_trigger_gate_in_catchup() {
        let h = harness(7, 64);
        h.status.set_catching_up(true);
        h.set_validated(5);
        for height in 1..=4 {
            h.park_pending(height);
        }
        let mut state = h.opened().await;

        // Four parked blocks are below the trigger, so nothing is written.
        tick(&mut state).await;
        assert!(h.db.put_batch_sizes().is_empty());
        assert_eq!(*state.tip(), h.entry(0));

        // A fifth lets the drain go ahead.
        h.park_pending(5);
        tick(&mut state).await;
        assert_eq!(h.db.put_batch_sizes(), vec![5]);
        assert_eq!(*state.tip(), h.entry(5));
    }

    #[tokio::test]
    async fn test_reorg_rolls_back_then_readvances() {
        let h = harness(4, 64);
        h.set_validated(3);
        let mut state = h.opened().await;
        tick(&mut state).await;
        assert_eq!(*state.tip(), h.entry(3));

        // Reorg: the block at height 3 is replaced and the chain extends to
        // height 4 on the new branch.
        let old_tip = h.blocks[3].blkid();
        let branch = build_fork(&h.blocks, 2, 2, 64);
        let mut reorged = h.blocks[..3].to_vec();
        reorged.extend(branch.iter().cloned());
        h.chain.set_entries(entries_for_blocks(&reorged));
        for block in &branch {
            h.fetcher.add_block(block.clone());
        }
        h.set_validated(4);

        // First tick detects the divergence and unwinds to the fork point.
        tick(&mut state).await;
        assert_eq!(*state.tip(), h.entry(2));
        assert_eq!(h.store_tip(), Some(*h.entry(2).blkid()));
        assert_eq!(h.db.deleted_blkids(), vec![old_tip]);
        assert!(!h.db.block_exists(old_tip).unwrap());

        // The next tick advances onto the new branch.
        tick(&mut state).await;
        assert_eq!(*state.tip(), h.entry(4));
        assert_eq!(h.store_tip(), Some(branch[1].blkid()));
        for block in &branch {
            assert!(h.db.block_exists(block.blkid()).unwrap());
        }
    }

    #[tokio::test]
    async fn test_advances_over_already_stored_block() {
        let h = harness(4, 64);
        h.set_validated(3);

        // Height 2 was stored by a concurrent path while the tip pointer
        // still sits at height 1.
        h.db.put_blocks(
            h.blocks[1].blkid(),
            vec![h.blocks[1].clone(), h.blocks[2].clone()],
        )
        .unwrap();

        let mut state = h.opened().await;
        assert_eq!(*state.tip(), h.entry(1));

        tick(&mut state).await;

        assert_eq!(*state.tip(), h.entry(3));
        // Only height 3 needed a download.
        let requested: Vec<u64> = h.fetcher.requested().iter().map(|e| e.height()).collect();
        assert_eq!(requested, vec![3]);
        assert_eq!(h.db.put_batch_sizes(), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_flush_drains_pending_without_downloads() {
        let mut h = harness(3, 64);
        h.fetcher = Arc::new(ScriptedFetcher::unavailable());
        h.status.set_catching_up(true);
        h.set_validated(2);
        h.park_pending(1);
        let mut state = h.opened().await;

        // Even in catch-up with the buffer below the trigger, a shutdown
        // flush writes what's there and asks the network for nothing.
        state.flush().await.expect("flush");

        assert_eq!(h.db.put_batch_sizes(), vec![1]);
        assert_eq!(*state.tip(), h.entry(1));
        assert!(h.fetcher.requested().is_empty());
    }

    #[tokio::test]
    async fn test_flush_skips_reorg_rollback() {
        let h = harness(4, 64);
        h.set_validated(3);
        let mut state = h.opened().await;
        tick(&mut state).await;

        let branch = build_fork(&h.blocks, 2, 2, 64);
        let mut reorged = h.blocks[..3].to_vec();
        reorged.extend(branch.iter().cloned());
        h.chain.set_entries(entries_for_blocks(&reorged));
        h.set_validated(4);

        state.flush().await.expect("flush");

        // No rollback during a shutdown drain.
        assert_eq!(*state.tip().blkid(), h.blocks[3].blkid());
        assert!(h.db.deleted_blkids().is_empty());
    }
}
