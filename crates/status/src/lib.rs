//! Container for node sync status, shared between the consensus machinery
//! and the block index store.

use moraine_primitives::BlockCommitment;
use serde::Serialize;
use tokio::sync::watch;
use tracing::*;

/// Describes where the node stands relative to the validated chain.
#[derive(Clone, Debug, Serialize)]
pub struct NodeSyncStatus {
    /// Highest header that has passed proof-of-work validation, if known.
    validated_tip: Option<BlockCommitment>,

    /// Whether the node is in initial bulk synchronization.
    catching_up: bool,

    /// Highest block the index store has durably persisted. Written only by
    /// the index store engine.
    indexed_tip: Option<BlockCommitment>,
}

impl Default for NodeSyncStatus {
    fn default() -> Self {
        Self {
            validated_tip: None,
            // A freshly started node is assumed to be catching up until the
            // consensus machinery says otherwise.
            catching_up: true,
            indexed_tip: None,
        }
    }
}

impl NodeSyncStatus {
    pub fn validated_tip(&self) -> Option<&BlockCommitment> {
        self.validated_tip.as_ref()
    }

    pub fn validated_height(&self) -> Option<u64> {
        self.validated_tip.as_ref().map(|c| c.height())
    }

    pub fn is_catching_up(&self) -> bool {
        self.catching_up
    }

    pub fn indexed_tip(&self) -> Option<&BlockCommitment> {
        self.indexed_tip.as_ref()
    }
}

/// Handle for watching and updating the node sync status.
#[derive(Clone, Debug)]
pub struct StatusChannel {
    tx: watch::Sender<NodeSyncStatus>,
    rx: watch::Receiver<NodeSyncStatus>,
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new(NodeSyncStatus::default())
    }
}

impl StatusChannel {
    pub fn new(initial: NodeSyncStatus) -> Self {
        let (tx, rx) = watch::channel(initial);
        Self { tx, rx }
    }

    /// Returns a snapshot of the current status.
    pub fn get(&self) -> NodeSyncStatus {
        self.rx.borrow().clone()
    }

    /// Subscribes to status changes.
    pub fn subscribe(&self) -> watch::Receiver<NodeSyncStatus> {
        self.rx.clone()
    }

    pub fn validated_height(&self) -> Option<u64> {
        self.rx.borrow().validated_height()
    }

    pub fn is_catching_up(&self) -> bool {
        self.rx.borrow().catching_up
    }

    pub fn indexed_tip(&self) -> Option<BlockCommitment> {
        self.rx.borrow().indexed_tip
    }

    /// Records a new highest indexed block. Only the index store engine
    /// writes this.
    pub fn update_indexed_tip(&self, indexed: BlockCommitment) {
        trace!(%indexed, "updating highest indexed block");
        self.tx.send_modify(|s| s.indexed_tip = Some(indexed));
    }

    /// Records a new highest validated header, written by the consensus side.
    pub fn update_validated_tip(&self, validated: BlockCommitment) {
        self.tx.send_modify(|s| s.validated_tip = Some(validated));
    }

    /// Flips the bulk-synchronization flag, written by the consensus side.
    pub fn set_catching_up(&self, catching_up: bool) {
        self.tx.send_modify(|s| s.catching_up = catching_up);
    }
}

#[cfg(test)]
mod tests {
    use moraine_primitives::BlockId;

    use super::*;

    #[test]
    fn test_updates_are_observed() {
        let channel = StatusChannel::default();
        assert!(channel.is_catching_up());
        assert_eq!(channel.validated_height(), None);

        let commitment = BlockCommitment::new(42, BlockId::zero());
        channel.update_validated_tip(commitment);
        channel.update_indexed_tip(commitment);
        channel.set_catching_up(false);

        assert_eq!(channel.validated_height(), Some(42));
        assert_eq!(channel.indexed_tip(), Some(commitment));
        assert!(!channel.is_catching_up());
    }
}
