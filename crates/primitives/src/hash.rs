//! Hashing utilities.

use sha2::{Digest, Sha256};

use crate::buf::Buf32;

/// Computes the double-SHA-256 of the input, the hash used for block identity.
pub fn sha256d(buf: &[u8]) -> Buf32 {
    let once = Sha256::digest(buf);
    let twice = Sha256::digest(once);
    Buf32::from(<[u8; 32]>::from(twice))
}
