use crate::{
    config::{ChainConfig, MiningStrategy},
    current_timestamp,
    error::{LedgerError, ValidationError},
    mine::{mine_cancellable, mine_parallel, CancelToken},
    Block, Payload, Transaction,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Append-only, in-memory chain anchored at the genesis block, with the
/// pending transaction pool of ledger mode.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ChainRecord")]
pub struct Chain {
    #[serde(rename = "chain")]
    blocks: Vec<Block>,
    pending_transactions: Vec<Transaction>,
    #[serde(flatten)]
    config: ChainConfig,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChainRecord {
    chain: Vec<Block>,
    #[serde(default)]
    pending_transactions: Vec<Transaction>,
    #[serde(flatten)]
    config: ChainConfig,
}

impl TryFrom<ChainRecord> for Chain {
    type Error = LedgerError;

    fn try_from(record: ChainRecord) -> Result<Self, Self::Error> {
        if record.chain.is_empty() {
            return Err(LedgerError::EmptyChain);
        }
        Ok(Self {
            blocks: record.chain,
            pending_transactions: record.pending_transactions,
            config: record.config,
        })
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    pub fn new() -> Self {
        Self::with_config(ChainConfig::default())
    }

    pub fn with_config(config: ChainConfig) -> Self {
        Self {
            blocks: vec![Block::genesis()],
            pending_transactions: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn difficulty(&self) -> u32 {
        self.config.difficulty
    }

    pub fn mining_reward(&self) -> i64 {
        self.config.mining_reward
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Raw access for simulating tampering. Nothing is rehashed or relinked;
    /// the slice cannot grow or shrink the chain.
    pub fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false: the genesis block is present from construction.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn latest_block(&self) -> &Block {
        // Construction and deserialization both guarantee the genesis block.
        &self.blocks[self.blocks.len() - 1]
    }

    /// Links `block` to the current tip, mines it (or only rehashes it when
    /// proof of work is off) and appends it. Blocks until a nonce is found.
    pub fn add_block(&mut self, mut block: Block) -> &Block {
        block.previous_hash = self.latest_block().hash.clone();
        if self.config.proof_of_work {
            match self.config.strategy {
                MiningStrategy::Sequential => block.mine(self.config.difficulty),
                MiningStrategy::Parallel => mine_parallel(&mut block, self.config.difficulty),
            }
        } else {
            block.recompute_hash();
        }
        self.push(block)
    }

    /// Like [`Chain::add_block`], but gives up when `cancel` fires. A cancelled
    /// call leaves the chain unchanged.
    pub fn add_block_cancellable(
        &mut self,
        mut block: Block,
        cancel: &CancelToken,
    ) -> Result<&Block, LedgerError> {
        block.previous_hash = self.latest_block().hash.clone();
        if self.config.proof_of_work {
            mine_cancellable(
                &mut block,
                self.config.difficulty,
                self.config.strategy,
                cancel,
            )?;
        } else {
            block.recompute_hash();
        }
        Ok(self.push(block))
    }

    fn push(&mut self, block: Block) -> &Block {
        debug!(
            "appended block {} at position {}",
            block.hash,
            self.blocks.len()
        );
        self.blocks.push(block);
        self.latest_block()
    }

    /// Walks every block after genesis and reports the first block whose
    /// stored hash is stale or whose `previous_hash` does not match its
    /// predecessor. Genesis itself is trusted.
    pub fn verify(&self) -> Result<(), ValidationError> {
        for (position, pair) in self.blocks.windows(2).enumerate() {
            let (previous, current) = (&pair[0], &pair[1]);
            let position = position + 1;

            let computed = current.calculate_hash();
            if current.hash != computed {
                return Err(ValidationError::HashMismatch {
                    position,
                    stored: current.hash.clone(),
                    computed,
                });
            }

            if current.previous_hash != previous.hash {
                return Err(ValidationError::BrokenLink {
                    position,
                    expected: previous.hash.clone(),
                    found: current.previous_hash.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn is_chain_valid(&self) -> bool {
        match self.verify() {
            Ok(()) => true,
            Err(err) => {
                warn!("chain invalid: {err}");
                false
            }
        }
    }

    /// Queues a transaction. No balance, signature or double-spend checks.
    pub fn create_transaction(&mut self, tx: Transaction) {
        debug!(
            "queued transaction {:?} -> {} ({})",
            tx.from_address, tx.to_address, tx.amount
        );
        self.pending_transactions.push(tx);
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending_transactions
    }

    /// Commits the whole pending pool into a new mined block, then reseeds the
    /// pool with a single reward for `reward_address`. The reward only counts
    /// once a later commit includes it.
    pub fn mine_pending_transactions(&mut self, reward_address: &str) -> &Block {
        let txs = std::mem::take(&mut self.pending_transactions);
        self.add_block(Block::new(None, current_timestamp(), Payload::Transactions(txs)));
        self.reseed_pool(reward_address);
        self.latest_block()
    }

    /// Like [`Chain::mine_pending_transactions`]; on cancellation neither the
    /// chain nor the pending pool changes.
    pub fn mine_pending_transactions_cancellable(
        &mut self,
        reward_address: &str,
        cancel: &CancelToken,
    ) -> Result<&Block, LedgerError> {
        let block = Block::new(
            None,
            current_timestamp(),
            Payload::Transactions(self.pending_transactions.clone()),
        );
        self.add_block_cancellable(block, cancel)?;
        self.reseed_pool(reward_address);
        Ok(self.latest_block())
    }

    fn reseed_pool(&mut self, reward_address: &str) {
        self.pending_transactions = vec![Transaction::reward(
            reward_address,
            self.config.mining_reward,
        )];
    }

    /// Every transaction in a committed block, oldest first.
    pub fn committed_transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.blocks.iter().flat_map(Block::transactions)
    }

    /// Replays committed blocks from scratch. Unknown addresses have balance 0;
    /// totals beyond the `i64` range saturate at its bounds.
    pub fn balance_of_address(&self, address: &str) -> i64 {
        let total = self.replay_balance(address);
        i64::try_from(total).unwrap_or(if total < 0 { i64::MIN } else { i64::MAX })
    }

    /// As [`Chain::balance_of_address`], but distinguishes an address that no
    /// committed transaction mentions and a total outside the `i64` range.
    pub fn try_balance_of_address(&self, address: &str) -> Result<i64, LedgerError> {
        if !self.committed_transactions().any(|tx| tx.touches(address)) {
            return Err(LedgerError::UnknownAddress(address.to_string()));
        }
        i64::try_from(self.replay_balance(address))
            .map_err(|_| LedgerError::BalanceOverflow(address.to_string()))
    }

    fn replay_balance(&self, address: &str) -> i128 {
        self.committed_transactions()
            .map(|tx| tx.balance_effect(address))
            .sum()
    }
}
