use serde_json::json;
use vipcoin_core::{Block, Chain, ChainConfig};

pub const TEST_DIFFICULTY: u32 = 2;

pub fn amount_block(index: u64, timestamp: &str, amount: i64) -> Block {
    Block::new(Some(index), timestamp, json!({ "amount": amount }))
}

pub fn test_chain() -> Chain {
    Chain::with_config(ChainConfig::default().with_difficulty(TEST_DIFFICULTY))
}

/// Genesis plus `extra` mined amount blocks.
pub fn chain_with_blocks(extra: u64) -> Chain {
    let mut chain = test_chain();
    for i in 1..=extra {
        chain.add_block(amount_block(i, &format!("02/{:02}/2018", 19 + i), i as i64 * 4));
    }
    chain
}
