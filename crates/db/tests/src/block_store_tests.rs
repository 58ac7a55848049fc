use moraine_db_types::traits::BlockStoreDatabase;
use moraine_primitives::{BlockId, RawBlock};
use moraine_test_utils::ArbitraryGenerator;

fn make_linked_blocks(count: usize) -> Vec<RawBlock> {
    let mut arb = ArbitraryGenerator::new_with_size(1 << 12);
    let mut parent = BlockId::zero();
    let mut blocks = Vec::with_capacity(count);
    for _ in 0..count {
        let body: Vec<u8> = arb.generate();
        let block = RawBlock::build(parent, body);
        parent = block.blkid();
        blocks.push(block);
    }
    blocks
}

pub fn test_fresh_store_has_no_tip(db: &impl BlockStoreDatabase) {
    assert_eq!(
        db.get_tip_blockid().unwrap(),
        None,
        "tip of a fresh store should be unset"
    );
}

pub fn test_put_blocks_advances_tip(db: &impl BlockStoreDatabase) {
    let blocks = make_linked_blocks(3);
    let tip = blocks.last().unwrap().blkid();

    let res = db.put_blocks(tip, blocks.clone());
    assert!(res.is_ok(), "put should work but got: {}", res.unwrap_err());

    assert_eq!(db.get_tip_blockid().unwrap(), Some(tip));
    for block in &blocks {
        assert!(db.block_exists(block.blkid()).unwrap());
    }
}

pub fn test_get_block(db: &impl BlockStoreDatabase) {
    let blocks = make_linked_blocks(2);
    let tip = blocks.last().unwrap().blkid();
    db.put_blocks(tip, blocks.clone()).unwrap();

    // fetch non existent block
    let missing = RawBlock::build(tip, vec![0xff; 16]).blkid();
    assert_eq!(db.get_block(missing).unwrap(), None);

    // fetch and check, existent block
    let observed = db.get_block(blocks[0].blkid()).unwrap();
    assert_eq!(observed, Some(blocks[0].clone()));
}

pub fn test_empty_batch_rejected(db: &impl BlockStoreDatabase) {
    let res = db.put_blocks(BlockId::zero(), Vec::new());
    assert!(res.is_err(), "empty batch should be rejected");
    assert_eq!(db.get_tip_blockid().unwrap(), None);
}

pub fn test_del_blocks_rolls_back_tip(db: &impl BlockStoreDatabase) {
    let blocks = make_linked_blocks(4);
    let tip = blocks.last().unwrap().blkid();
    db.put_blocks(tip, blocks.clone()).unwrap();

    // roll back the last two blocks
    let new_tip = blocks[1].blkid();
    let stale = vec![blocks[3].blkid(), blocks[2].blkid()];
    db.del_blocks(new_tip, stale.clone()).unwrap();

    assert_eq!(db.get_tip_blockid().unwrap(), Some(new_tip));
    for blkid in stale {
        assert!(!db.block_exists(blkid).unwrap());
    }
    assert!(db.block_exists(blocks[0].blkid()).unwrap());
    assert!(db.block_exists(blocks[1].blkid()).unwrap());
}

pub fn test_tx_index_idempotent(db: &impl BlockStoreDatabase) {
    db.set_tx_index(true).unwrap();
    db.set_tx_index(true).unwrap();
    db.set_tx_index(false).unwrap();
    db.set_tx_index(true).unwrap();
}

#[macro_export]
macro_rules! block_store_db_tests {
    ($setup_expr:expr) => {
        #[test]
        fn test_fresh_store_has_no_tip() {
            let db = $setup_expr;
            $crate::block_store_tests::test_fresh_store_has_no_tip(&db);
        }

        #[test]
        fn test_put_blocks_advances_tip() {
            let db = $setup_expr;
            $crate::block_store_tests::test_put_blocks_advances_tip(&db);
        }

        #[test]
        fn test_get_block() {
            let db = $setup_expr;
            $crate::block_store_tests::test_get_block(&db);
        }

        #[test]
        fn test_empty_batch_rejected() {
            let db = $setup_expr;
            $crate::block_store_tests::test_empty_batch_rejected(&db);
        }

        #[test]
        fn test_del_blocks_rolls_back_tip() {
            let db = $setup_expr;
            $crate::block_store_tests::test_del_blocks_rolls_back_tip(&db);
        }

        #[test]
        fn test_tx_index_idempotent() {
            let db = $setup_expr;
            $crate::block_store_tests::test_tx_index_idempotent(&db);
        }
    };
}
