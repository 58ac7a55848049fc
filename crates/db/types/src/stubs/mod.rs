//! In-memory stub database implementations.

mod block_store;

pub use block_store::StubBlockStoreDb;
