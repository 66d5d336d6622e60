use crate::{
    config::MiningStrategy, constants::PARALLEL_NONCE_WINDOW, digest_hex, error::LedgerError,
    pow::meets_difficulty, Block,
};
use rayon::prelude::*;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{info, warn};

/// Shared flag that stops a running nonce search. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Mines the block across the rayon pool. Nonces are searched in windows and
/// the lowest satisfying nonce of the first productive window wins, so the
/// result is identical to the sequential search.
pub fn mine_parallel(block: &mut Block, difficulty: u32) {
    let prefix = block.hash_prefix();
    let mut start = 0u64;
    let nonce = loop {
        if let Some(nonce) = search_window(&prefix, start, difficulty) {
            break nonce;
        }
        start = start.saturating_add(PARALLEL_NONCE_WINDOW);
    };
    finish(block, &prefix, nonce);
}

/// Mines with the given strategy, checking `cancel` between attempts
/// (sequential) or between windows (parallel). On cancellation the block's
/// nonce and hash are left as they were.
pub fn mine_cancellable(
    block: &mut Block,
    difficulty: u32,
    strategy: MiningStrategy,
    cancel: &CancelToken,
) -> Result<(), LedgerError> {
    let prefix = block.hash_prefix();
    let nonce = match strategy {
        MiningStrategy::Sequential => {
            let mut nonce = 0u64;
            loop {
                if cancel.is_cancelled() {
                    return Err(cancelled(nonce));
                }
                if meets_difficulty(&digest_hex(&prefix, nonce), difficulty) {
                    break nonce;
                }
                nonce = nonce.wrapping_add(1);
            }
        }
        MiningStrategy::Parallel => {
            let mut start = 0u64;
            loop {
                if cancel.is_cancelled() {
                    return Err(cancelled(start));
                }
                if let Some(nonce) = search_window(&prefix, start, difficulty) {
                    break nonce;
                }
                start = start.saturating_add(PARALLEL_NONCE_WINDOW);
            }
        }
    };
    finish(block, &prefix, nonce);
    Ok(())
}

fn search_window(prefix: &str, start: u64, difficulty: u32) -> Option<u64> {
    (start..start.saturating_add(PARALLEL_NONCE_WINDOW))
        .into_par_iter()
        .find_first(|nonce| meets_difficulty(&digest_hex(prefix, *nonce), difficulty))
}

fn finish(block: &mut Block, prefix: &str, nonce: u64) {
    block.nonce = nonce;
    block.hash = digest_hex(prefix, nonce);
    info!("Block mined: {}", block.hash);
}

fn cancelled(attempts: u64) -> LedgerError {
    warn!("mining cancelled after {attempts} attempts");
    LedgerError::MiningCancelled { attempts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::{thread, time::Duration};

    #[test]
    fn parallel_matches_sequential() {
        for difficulty in 0..=3 {
            let mut sequential = Block::new(Some(1), "02/20/2018", json!({ "amount": 4 }));
            let mut parallel = sequential.clone();
            sequential.mine(difficulty);
            mine_parallel(&mut parallel, difficulty);
            assert_eq!(parallel.nonce, sequential.nonce);
            assert_eq!(parallel.hash, sequential.hash);
        }
    }

    #[test]
    fn parallel_known_nonce() {
        let mut block = Block::new(Some(1), "02/20/2018", json!({ "amount": 4 }));
        mine_parallel(&mut block, 3);
        assert_eq!(block.nonce, 6194);
        assert!(block.is_hash_current());
    }

    #[test]
    fn cancellable_mines_when_not_cancelled() {
        for strategy in [MiningStrategy::Sequential, MiningStrategy::Parallel] {
            let mut block = Block::new(Some(1), "02/20/2018", json!({ "amount": 4 }));
            mine_cancellable(&mut block, 2, strategy, &CancelToken::new()).unwrap();
            assert_eq!(block.nonce, 271);
        }
    }

    #[test]
    fn pre_cancelled_token_leaves_block_untouched() {
        let token = CancelToken::new();
        token.cancel();
        for strategy in [MiningStrategy::Sequential, MiningStrategy::Parallel] {
            let mut block = Block::new(Some(1), "02/20/2018", json!({ "amount": 4 }));
            let before = block.clone();
            let err = mine_cancellable(&mut block, 2, strategy, &token).unwrap_err();
            assert_eq!(err, LedgerError::MiningCancelled { attempts: 0 });
            assert_eq!(block, before);
        }
    }

    #[test]
    fn cancel_from_another_thread_stops_unreachable_search() {
        let token = CancelToken::new();
        let remote = token.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            remote.cancel();
        });
        let mut block = Block::new(Some(1), "02/20/2018", json!({ "amount": 4 }));
        // 65 leading zeros can never be satisfied by a 64-character digest.
        let result = mine_cancellable(&mut block, 65, MiningStrategy::Sequential, &token);
        canceller.join().unwrap();
        assert!(matches!(result, Err(LedgerError::MiningCancelled { attempts }) if attempts > 0));
        assert!(token.is_cancelled());
    }
}
