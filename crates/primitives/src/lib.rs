//! Collection of generic internal data types that are used widely.

pub mod block;
pub mod buf;
pub mod hash;

pub use block::{BlockCommitment, BlockHeader, BlockId, ChainEntry, RawBlock};
pub use buf::Buf32;
pub use hash::sha256d;
