pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const DEFAULT_DIFFICULTY: u32 = 4;
pub const DEFAULT_MINING_REWARD: i64 = 100;
pub const GENESIS_TIMESTAMP: &str = "01/01/2018";
pub const GENESIS_DATA: &str = "Genesis Block";
pub const GENESIS_PREVIOUS_HASH: &str = "0";
/// Nonces handed to rayon per round of the parallel search.
pub const PARALLEL_NONCE_WINDOW: u64 = 1 << 16;
/// SHA-256 of `0 ++ GENESIS_TIMESTAMP ++ "\"Genesis Block\"" ++ 0`.
pub const GENESIS_HASH: &str = "6d8f5906ff9f26c9b0b254284e38a99e347d4365ed5994ad942d888680774835";
