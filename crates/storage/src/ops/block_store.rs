//! Block store data operation interface.

use moraine_db_types::traits::BlockStoreDatabase;
use moraine_primitives::{BlockId, RawBlock};

use crate::exec::*;

inst_ops_simple! {
    (<D: BlockStoreDatabase> => BlockStoreOps) {
        get_tip_blockid() => Option<BlockId>;
        block_exists(blkid: BlockId) => bool;
        get_block(blkid: BlockId) => Option<RawBlock>;
        put_blocks(new_tip: BlockId, blocks: Vec<RawBlock>) => ();
        del_blocks(new_tip: BlockId, blkids: Vec<BlockId>) => ();
        set_tx_index(enabled: bool) => ();
    }
}
