use crate::constants::{DEFAULT_DIFFICULTY, DEFAULT_MINING_REWARD, HASH_HEX_SIZE};
use crate::error::LedgerError;
use serde::{Deserialize, Serialize};

/// How the nonce search is executed. Both strategies settle on the same nonce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MiningStrategy {
    #[default]
    Sequential,
    Parallel,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    /// Leading hex zeros required of a mined block hash.
    pub difficulty: u32,
    pub mining_reward: i64,
    /// When false, appended blocks are only rehashed, never mined.
    pub proof_of_work: bool,
    #[serde(default)]
    pub strategy: MiningStrategy,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            mining_reward: DEFAULT_MINING_REWARD,
            proof_of_work: true,
            strategy: MiningStrategy::Sequential,
        }
    }
}

impl ChainConfig {
    pub fn with_difficulty(mut self, difficulty: u32) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_mining_reward(mut self, mining_reward: i64) -> Self {
        self.mining_reward = mining_reward;
        self
    }

    pub fn with_proof_of_work(mut self, proof_of_work: bool) -> Self {
        self.proof_of_work = proof_of_work;
        self
    }

    pub fn with_strategy(mut self, strategy: MiningStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Rejects a difficulty no digest could ever satisfy. The chain does not
    /// call this itself; front ends check user input with it.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.difficulty as usize > HASH_HEX_SIZE {
            return Err(LedgerError::InvalidDifficulty(self.difficulty));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_example() {
        let config = ChainConfig::default();
        assert_eq!(config.difficulty, 4);
        assert_eq!(config.mining_reward, 100);
        assert!(config.proof_of_work);
        assert_eq!(config.strategy, MiningStrategy::Sequential);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_unreachable_difficulty() {
        assert!(ChainConfig::default().with_difficulty(64).validate().is_ok());
        assert_eq!(
            ChainConfig::default().with_difficulty(65).validate(),
            Err(LedgerError::InvalidDifficulty(65))
        );
    }

    #[test]
    fn config_serialization_example() {
        let config = ChainConfig::default()
            .with_difficulty(2)
            .with_strategy(MiningStrategy::Parallel);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(
            json,
            r#"{"difficulty":2,"miningReward":100,"proofOfWork":true,"strategy":"parallel"}"#
        );
        let without_strategy: ChainConfig =
            serde_json::from_str(r#"{"difficulty":1,"miningReward":5,"proofOfWork":false}"#)
                .unwrap();
        assert_eq!(without_strategy.strategy, MiningStrategy::Sequential);
        assert!(!without_strategy.proof_of_work);
    }
}
