use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::block::Block;
use crate::constants::DIFFICULTY;
use crate::transaction::Transaction;

/// Searches a nonce such that the block built from `parent` and
/// `transactions` satisfies proof of work, starting from `nonce = 0` and
/// incrementing until `hasPoW(hash)` holds. There is no upper bound on
/// iterations and no cancellation: this matches the out-of-process mining
/// outer loop that embeddings are expected to provide themselves.
pub fn generate_next_block(parent: &Block, transactions: Vec<Transaction>) -> Block {
    mine(parent, transactions, None).expect("unbounded mining loop always returns")
}

/// As [`generate_next_block`], but polls `cancel` between nonce iterations
/// and stops early if it reads `true`, returning `None`.
pub fn generate_next_block_cancellable(
    parent: &Block,
    transactions: Vec<Transaction>,
    cancel: &AtomicBool,
) -> Option<Block> {
    mine(parent, transactions, Some(cancel))
}

fn mine(parent: &Block, transactions: Vec<Transaction>, cancel: Option<&AtomicBool>) -> Option<Block> {
    let next_index = parent.index + 1;
    let next_timestamp = wall_clock_timestamp();
    let previous_hash = parent.hash.to_hex();

    let mut nonce = 0u64;
    loop {
        if let Some(flag) = cancel {
            if flag.load(Ordering::Relaxed) {
                return None;
            }
        }

        let candidate = Block::new(
            next_index,
            next_timestamp,
            transactions.clone(),
            nonce,
            previous_hash.clone(),
        );
        if candidate.has_proof_of_work() {
            return Some(candidate);
        }
        nonce += 1;
    }
}

fn wall_clock_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the Unix epoch")
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mined_block_satisfies_proof_of_work_and_links_to_parent() {
        let genesis = Block::genesis();
        let tx = Transaction::coinbase("aa".to_string(), 10, 2.0);
        let mined = generate_next_block(&genesis, vec![tx]);

        assert!(mined.has_proof_of_work());
        assert_eq!(mined.previous_hash, genesis.hash.to_hex());
        assert_eq!(mined.index, genesis.index + 1);
    }

    #[test]
    fn cancellation_flag_stops_the_search() {
        let genesis = Block::genesis();
        let tx = Transaction::coinbase("aa".to_string(), 10, 2.0);
        let cancel = AtomicBool::new(true);
        let result = generate_next_block_cancellable(&genesis, vec![tx], &cancel);
        assert!(result.is_none());
    }
}
