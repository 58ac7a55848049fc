//! Block identity and chain-position types.

use std::fmt;

use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{buf::Buf32, hash::sha256d};

/// ID of a block, the double-SHA-256 of its header.
#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Default,
    Arbitrary,
    BorshSerialize,
    BorshDeserialize,
    Deserialize,
    Serialize,
)]
pub struct BlockId(Buf32);

impl BlockId {
    /// The all-zero id, used as the parent link of the genesis block.
    pub fn zero() -> Self {
        Self(Buf32::zero())
    }
}

impl From<Buf32> for BlockId {
    fn from(value: Buf32) -> Self {
        Self(value)
    }
}

impl From<BlockId> for Buf32 {
    fn from(value: BlockId) -> Self {
        value.0
    }
}

impl AsRef<[u8; 32]> for BlockId {
    fn as_ref(&self) -> &[u8; 32] {
        self.0.as_ref()
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A block position without link information, height paired with id.
#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Default,
    Arbitrary,
    BorshSerialize,
    BorshDeserialize,
    Deserialize,
    Serialize,
)]
pub struct BlockCommitment {
    height: u64,
    blkid: BlockId,
}

impl BlockCommitment {
    pub fn new(height: u64, blkid: BlockId) -> Self {
        Self { height, blkid }
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn blkid(&self) -> &BlockId {
        &self.blkid
    }
}

impl fmt::Display for BlockCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.height, self.blkid)
    }
}

impl fmt::Debug for BlockCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BlockCommitment(height={}, blkid={:?})",
            self.height, self.blkid
        )
    }
}

/// An addressable position in the best-known header chain.
///
/// Produced only by a chain view; immutable once handed out. Two entries `a`
/// and `b` are chain-linked iff `b.parent() == a.blkid()`.
#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Arbitrary,
    BorshSerialize,
    BorshDeserialize,
    Deserialize,
    Serialize,
)]
pub struct ChainEntry {
    height: u64,
    blkid: BlockId,
    parent: BlockId,
}

impl ChainEntry {
    pub fn new(height: u64, blkid: BlockId, parent: BlockId) -> Self {
        Self {
            height,
            blkid,
            parent,
        }
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn blkid(&self) -> &BlockId {
        &self.blkid
    }

    pub fn parent(&self) -> &BlockId {
        &self.parent
    }

    pub fn commitment(&self) -> BlockCommitment {
        BlockCommitment::new(self.height, self.blkid)
    }
}

impl fmt::Display for ChainEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.height, self.blkid)
    }
}

impl fmt::Debug for ChainEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ChainEntry(height={}, blkid={:?}, parent={:?})",
            self.height, self.blkid, self.parent
        )
    }
}

/// Minimal block header carrying the parent link recovery walks follow.
#[derive(
    Copy, Clone, Eq, PartialEq, Debug, Arbitrary, BorshSerialize, BorshDeserialize, Serialize,
    Deserialize,
)]
pub struct BlockHeader {
    parent: BlockId,
    body_root: Buf32,
}

impl BlockHeader {
    /// Serialized header length, counted into a block's byte size.
    pub const SERIALIZED_SIZE: usize = 64;

    pub fn new(parent: BlockId, body_root: Buf32) -> Self {
        Self { parent, body_root }
    }

    pub fn parent(&self) -> &BlockId {
        &self.parent
    }

    pub fn body_root(&self) -> &Buf32 {
        &self.body_root
    }

    /// Computes the block id for this header.
    pub fn compute_blkid(&self) -> BlockId {
        let mut buf = [0u8; Self::SERIALIZED_SIZE];
        buf[..32].copy_from_slice(self.parent.as_ref());
        buf[32..].copy_from_slice(self.body_root.as_ref());
        BlockId::from(sha256d(&buf))
    }
}

/// A full block, the header plus an opaque serialized body.
#[derive(Clone, Eq, PartialEq, Debug, Arbitrary, BorshSerialize, BorshDeserialize)]
pub struct RawBlock {
    header: BlockHeader,
    body: Vec<u8>,
}

impl RawBlock {
    pub fn new(header: BlockHeader, body: Vec<u8>) -> Self {
        Self { header, body }
    }

    /// Builds a block on top of `parent`, committing to the body.
    pub fn build(parent: BlockId, body: Vec<u8>) -> Self {
        let header = BlockHeader::new(parent, sha256d(&body));
        Self { header, body }
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn blkid(&self) -> BlockId {
        self.header.compute_blkid()
    }

    /// Byte length used for batch size accounting.
    pub fn serialized_size(&self) -> u64 {
        (BlockHeader::SERIALIZED_SIZE + self.body.len()) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blkid_commits_to_parent_and_body() {
        let base = RawBlock::build(BlockId::zero(), vec![1, 2, 3]);
        let other_parent = RawBlock::build(base.blkid(), vec![1, 2, 3]);
        let other_body = RawBlock::build(BlockId::zero(), vec![4, 5, 6]);
        assert_ne!(base.blkid(), other_parent.blkid());
        assert_ne!(base.blkid(), other_body.blkid());
    }

    #[test]
    fn test_serialized_size_counts_header() {
        let block = RawBlock::build(BlockId::zero(), vec![0; 100]);
        assert_eq!(block.serialized_size(), 164);
    }
}
