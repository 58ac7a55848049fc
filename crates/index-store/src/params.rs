//! Configuration parameters for the index store engine.

use std::time::Duration;

/// Engine tunables. None of these are wire-visible.
#[derive(Debug, Clone, Copy)]
pub struct IndexParams {
    /// Whether a re-index from scratch was requested. Unsupported; the
    /// engine refuses to start with this set.
    pub reindex: bool,

    /// Byte total above which an accumulated batch is flushed to the store.
    pub batch_size_bytes: u64,

    /// Minimum pending buffer occupancy before draining it during bulk sync,
    /// so catch-up issues fewer, larger writes.
    pub pending_trigger: usize,

    /// Bound on outstanding download requests.
    pub download_queue_depth: usize,

    /// Delay inserted after a mid-drain flush during bulk sync, so indexing
    /// doesn't outrun downstream consumers.
    pub catchup_pacing: Duration,

    /// Interval between scheduled ticks.
    pub poll_interval: Duration,

    /// Delay before the first tick after startup.
    pub startup_delay: Duration,

    /// Delay between polls for a block the fetcher hasn't produced yet.
    pub stall_retry: Duration,

    /// Consecutive fetcher misses after which the download pipeline is
    /// abandoned until the next tick.
    pub stall_abort_limit: u32,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            reindex: false,
            // 5mb is not much in case the store needs to catch up
            batch_size_bytes: 1_000_000 * 5,
            pending_trigger: 5,
            download_queue_depth: 1000,
            catchup_pacing: Duration::from_millis(100),
            poll_interval: Duration::from_secs(1),
            startup_delay: Duration::from_secs(5),
            stall_retry: Duration::from_millis(100),
            stall_abort_limit: 10_000,
        }
    }
}
