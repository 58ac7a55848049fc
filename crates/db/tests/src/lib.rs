//! Reusable conformance tests for [`BlockStoreDatabase`] implementations.
//!
//! Implementations invoke [`block_store_db_tests!`] with an expression that
//! constructs a fresh database.
//!
//! [`BlockStoreDatabase`]: moraine_db_types::traits::BlockStoreDatabase

pub mod block_store_tests;

#[cfg(test)]
mod stub_tests {
    use moraine_db_types::stubs::StubBlockStoreDb;

    crate::block_store_db_tests!(StubBlockStoreDb::new());
}
