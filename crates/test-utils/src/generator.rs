use arbitrary::{Arbitrary, Unstructured};
use rand::RngCore;

const DEFAULT_BUF_SIZE: usize = 1 << 14;

/// Generator for arbitrary test values, backed by a freshly randomized byte
/// buffer on every call.
#[derive(Debug)]
pub struct ArbitraryGenerator {
    buf: Vec<u8>,
}

impl Default for ArbitraryGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ArbitraryGenerator {
    pub fn new() -> Self {
        Self::new_with_size(DEFAULT_BUF_SIZE)
    }

    pub fn new_with_size(n: usize) -> Self {
        Self { buf: vec![0; n] }
    }

    pub fn generate<'a, T: Arbitrary<'a>>(&'a mut self) -> T {
        rand::thread_rng().fill_bytes(&mut self.buf);
        let mut u = Unstructured::new(&self.buf);
        T::arbitrary(&mut u).expect("failed to generate arbitrary instance")
    }
}
