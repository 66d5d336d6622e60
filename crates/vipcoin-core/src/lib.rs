use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod chain;
pub mod config;
pub mod constants;
pub mod error;
pub mod mine;

pub use chain::Chain;
pub use config::{ChainConfig, MiningStrategy};
pub use error::{LedgerError, ValidationError};
pub use mine::CancelToken;

use constants::{GENESIS_DATA, GENESIS_PREVIOUS_HASH, GENESIS_TIMESTAMP};

/// A value transfer. `from_address` is `None` for miner rewards, which debit nobody.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Transaction {
    pub from_address: Option<String>,
    pub to_address: String,
    pub amount: i64,
}

impl Transaction {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: i64) -> Self {
        Self {
            from_address: Some(from.into()),
            to_address: to.into(),
            amount,
        }
    }

    pub fn reward(to: impl Into<String>, amount: i64) -> Self {
        Self {
            from_address: None,
            to_address: to.into(),
            amount,
        }
    }

    pub fn is_reward(&self) -> bool {
        self.from_address.is_none()
    }

    /// Net effect of this transaction on `address`. Widened to `i128` so
    /// negating or summing any `i64` amount cannot overflow.
    pub fn balance_effect(&self, address: &str) -> i128 {
        let amount = i128::from(self.amount);
        let mut effect = 0;
        if self.from_address.as_deref() == Some(address) {
            effect -= amount;
        }
        if self.to_address == address {
            effect += amount;
        }
        effect
    }

    pub fn touches(&self, address: &str) -> bool {
        self.from_address.as_deref() == Some(address) || self.to_address == address
    }
}

/// Block content: a transaction list in ledger mode, any JSON value otherwise.
/// Inside a block the variant is the JSON key, `transactions` or `data`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    #[serde(rename = "transactions")]
    Transactions(Vec<Transaction>),
    #[serde(rename = "data")]
    Opaque(Value),
}

impl Payload {
    /// Compact JSON with object keys in insertion order.
    pub fn canonical_json(&self) -> String {
        match self {
            Payload::Opaque(value) => value.to_string(),
            // Plain strings and integers in a derived struct always serialize.
            Payload::Transactions(txs) => {
                serde_json::to_string(txs).expect("transactions serialize to JSON")
            }
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        match self {
            Payload::Transactions(txs) => txs,
            Payload::Opaque(_) => &[],
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Opaque(value)
    }
}

impl From<Vec<Transaction>> for Payload {
    fn from(txs: Vec<Transaction>) -> Self {
        Payload::Transactions(txs)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u64>,
    pub timestamp: String,
    #[serde(flatten)]
    pub payload: Payload,
    pub previous_hash: String,
    pub hash: String,
    pub nonce: u64,
}

impl Block {
    /// Builds an unlinked block and hashes it with nonce 0. The chain sets
    /// `previous_hash` when the block is appended.
    pub fn new(
        index: Option<u64>,
        timestamp: impl Into<String>,
        payload: impl Into<Payload>,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp: timestamp.into(),
            payload: payload.into(),
            previous_hash: String::new(),
            hash: String::new(),
            nonce: 0,
        };
        block.hash = block.calculate_hash();
        block
    }

    /// The fixed first block. Its preimage ends in nonce `0`, so its hash is
    /// [`constants::GENESIS_HASH`]; chains whose genesis was hashed with an
    /// unset nonce (`...undefined`) will not link to it.
    pub fn genesis() -> Self {
        let mut block = Self::new(Some(0), GENESIS_TIMESTAMP, Value::from(GENESIS_DATA));
        block.previous_hash = GENESIS_PREVIOUS_HASH.to_string();
        block
    }

    pub fn calculate_hash(&self) -> String {
        calculate_hash(self.index, &self.timestamp, &self.payload, self.nonce)
    }

    pub fn recompute_hash(&mut self) -> &str {
        self.hash = self.calculate_hash();
        &self.hash
    }

    /// Replaces the payload and rehashes. Writing `payload` directly leaves
    /// the stored hash stale, which validation reports.
    pub fn set_payload(&mut self, payload: impl Into<Payload>) {
        self.payload = payload.into();
        self.recompute_hash();
    }

    pub fn is_hash_current(&self) -> bool {
        self.hash == self.calculate_hash()
    }

    pub fn transactions(&self) -> &[Transaction] {
        self.payload.transactions()
    }

    pub fn mine(&mut self, difficulty: u32) {
        pow::mine(self, difficulty);
    }

    pub(crate) fn hash_prefix(&self) -> String {
        preimage_prefix(self.index, &self.timestamp, &self.payload)
    }
}

/// SHA-256 over `index ++ timestamp ++ json(payload) ++ nonce`, hex encoded.
/// An absent index contributes nothing.
pub fn calculate_hash(
    index: Option<u64>,
    timestamp: &str,
    payload: &Payload,
    nonce: u64,
) -> String {
    digest_hex(&preimage_prefix(index, timestamp, payload), nonce)
}

fn preimage_prefix(index: Option<u64>, timestamp: &str, payload: &Payload) -> String {
    let mut prefix = index.map(|i| i.to_string()).unwrap_or_default();
    prefix.push_str(timestamp);
    prefix.push_str(&payload.canonical_json());
    prefix
}

pub(crate) fn digest_hex(prefix: &str, nonce: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(nonce.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Milliseconds since the Unix epoch, as used for ledger block timestamps.
pub fn current_timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        .to_string()
}

pub mod pow {
    use super::{digest_hex, Block};
    use tracing::info;

    /// True when the first `difficulty` characters of `hash` are all `'0'`.
    pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
        let d = difficulty as usize;
        hash.len() >= d && hash.bytes().take(d).all(|b| b == b'0')
    }

    /// Mine the block by counting the nonce up from 0 until the hash meets
    /// `difficulty`. Unbounded; difficulty 0 returns after one hash.
    pub fn mine(block: &mut Block, difficulty: u32) {
        let prefix = block.hash_prefix();
        block.nonce = 0;
        block.hash = digest_hex(&prefix, block.nonce);
        while !meets_difficulty(&block.hash, difficulty) {
            block.nonce = block.nonce.wrapping_add(1);
            block.hash = digest_hex(&prefix, block.nonce);
        }
        info!("Block mined: {}", block.hash);
    }
}
