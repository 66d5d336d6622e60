use crate::constants::HASH_HEX_SIZE;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("mining cancelled after {attempts} attempts")]
    MiningCancelled { attempts: u64 },

    #[error("no committed transactions for address {0}")]
    UnknownAddress(String),

    #[error("balance of address {0} does not fit in an i64")]
    BalanceOverflow(String),

    #[error("difficulty {0} exceeds the {max} hex characters of a digest", max = HASH_HEX_SIZE)]
    InvalidDifficulty(u32),

    #[error("a chain must contain at least the genesis block")]
    EmptyChain,
}

/// First integrity failure found while walking the chain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("block {position}: stored hash {stored} does not match content hash {computed}")]
    HashMismatch {
        position: usize,
        stored: String,
        computed: String,
    },

    #[error("block {position}: previous hash {found} does not match predecessor hash {expected}")]
    BrokenLink {
        position: usize,
        expected: String,
        found: String,
    },
}

impl ValidationError {
    pub fn position(&self) -> usize {
        match self {
            Self::HashMismatch { position, .. } | Self::BrokenLink { position, .. } => *position,
        }
    }
}
