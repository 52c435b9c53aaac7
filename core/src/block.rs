use ledger_shared::Hash256;
use serde::{Deserialize, Serialize};

use crate::constants::{
    COINBASE_REWARD, DIFFICULTY, GENESIS_ADDRESS_HEX, GENESIS_AMOUNT, GENESIS_TIMESTAMP,
    MAX_TRANSACTIONS_PER_BLOCK, MIN_TRANSACTION_AMOUNT,
};
use crate::error::ChainError;
use crate::transaction::Transaction;

/// A block of transactions chained to its predecessor by hash.
///
/// The genesis block has `index == 0`, the fixed [`GENESIS_TIMESTAMP`], a
/// single coinbase output crediting the hard-coded genesis address, and an
/// empty `previous_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: f64,
    pub transactions: Vec<Transaction>,
    pub nonce: u64,
    #[serde(rename = "previousHash")]
    pub previous_hash: String,
    pub hash: Hash256,
}

impl Block {
    /// Builds a block and computes its hash; the caller supplies `nonce`
    /// (usually discovered by the miner) rather than searching for it here.
    pub fn new(
        index: u64,
        timestamp: f64,
        transactions: Vec<Transaction>,
        nonce: u64,
        previous_hash: String,
    ) -> Self {
        let hash = compute_block_hash(index, timestamp, &transactions, nonce, &previous_hash);
        Self {
            index,
            timestamp,
            transactions,
            nonce,
            previous_hash,
            hash,
        }
    }

    pub fn recompute_hash(&self) -> Hash256 {
        compute_block_hash(
            self.index,
            self.timestamp,
            &self.transactions,
            self.nonce,
            &self.previous_hash,
        )
    }

    pub fn has_valid_hash(&self) -> bool {
        self.hash == self.recompute_hash()
    }

    pub fn has_proof_of_work(&self) -> bool {
        self.hash.meets_difficulty(DIFFICULTY)
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.previous_hash.is_empty()
    }

    /// Builds the hard-coded genesis block, mining a nonce so the result
    /// satisfies proof of work with its fixed timestamp and coinbase.
    pub fn genesis() -> Self {
        build_genesis(GENESIS_ADDRESS_HEX.to_string())
    }

    /// Builds a genesis block crediting `address` instead of the shipped
    /// production address. Useful for tests and embeddings that need to
    /// hold the matching private key in order to exercise spending the
    /// genesis coinbase.
    pub fn genesis_with_address(address: String) -> Self {
        build_genesis(address)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses a block from JSON, rejecting it if the block hash or any
    /// transaction hash does not match its recomputed value.
    pub fn from_json(s: &str) -> Result<Self, ChainError> {
        let block: Block = serde_json::from_str(s).map_err(|e| ChainError::Block(e.to_string()))?;
        for tx in &block.transactions {
            if !tx.has_valid_hash() {
                return Err(ChainError::Block(
                    "a transaction hash does not match its fields".to_string(),
                ));
            }
        }
        if !block.has_valid_hash() {
            return Err(ChainError::Block(
                "block hash does not match its fields".to_string(),
            ));
        }
        Ok(block)
    }
}

fn build_genesis(address: String) -> Block {
    let coinbase = Transaction::coinbase(address, GENESIS_AMOUNT, GENESIS_TIMESTAMP);
    let transactions = vec![coinbase];

    let mut nonce = 0u64;
    loop {
        let hash = compute_block_hash(0, GENESIS_TIMESTAMP, &transactions, nonce, "");
        if hash.meets_difficulty(DIFFICULTY) {
            return Block {
                index: 0,
                timestamp: GENESIS_TIMESTAMP,
                transactions,
                nonce,
                previous_hash: String::new(),
                hash,
            };
        }
        nonce += 1;
    }
}

fn compute_block_hash(
    index: u64,
    timestamp: f64,
    transactions: &[Transaction],
    nonce: u64,
    previous_hash: &str,
) -> Hash256 {
    let combined_tx_hashes: String = transactions.iter().map(|tx| tx.hash.to_hex()).collect();
    let preimage = format!("{}{}{}{}{}", index, timestamp, combined_tx_hashes, nonce, previous_hash);
    Hash256::sha256(preimage.as_bytes())
}

/// Checks that `next` is a valid direct successor of `prev`: correct index,
/// correct link, a correctly recomputed hash, proof of work, and a
/// syntactically valid transaction list.
pub fn verify_next_block(prev: &Block, next: &Block) -> Result<(), ChainError> {
    if next.index != prev.index + 1 {
        return Err(ChainError::Chain(
            "next block's index must be one more than its parent's".to_string(),
        ));
    }
    if next.previous_hash != prev.hash.to_hex() {
        return Err(ChainError::Chain(
            "next block's previousHash does not match its parent's hash".to_string(),
        ));
    }
    if !next.has_valid_hash() {
        return Err(ChainError::Chain(
            "block hash does not match its fields".to_string(),
        ));
    }
    if !next.has_proof_of_work() {
        return Err(ChainError::Chain(
            "block hash does not satisfy proof of work".to_string(),
        ));
    }
    verify_transactions_syntax(&next.transactions)?;
    Ok(())
}

/// Stateless structural check of a block's transaction list: size bounds,
/// hash integrity, duplicate rejection, coinbase shape, and intra-block
/// double-spend rejection. Signature validity and balance are checked
/// later, by the UTXO manager at application time.
pub fn verify_transactions_syntax(txs: &[Transaction]) -> Result<(), ChainError> {
    if txs.is_empty() || txs.len() > MAX_TRANSACTIONS_PER_BLOCK {
        return Err(ChainError::Chain(format!(
            "a block must contain between 1 and {} transactions",
            MAX_TRANSACTIONS_PER_BLOCK
        )));
    }

    let mut seen_hashes = std::collections::HashSet::new();
    let mut coinbase_count = 0usize;

    for tx in txs {
        if !tx.has_valid_hash() {
            return Err(ChainError::Chain(
                "a transaction hash does not match its fields".to_string(),
            ));
        }
        if !seen_hashes.insert(tx.hash) {
            return Err(ChainError::Chain(
                "duplicate transaction hash in block".to_string(),
            ));
        }
        if tx.inputs.is_empty() {
            coinbase_count += 1;
            if tx.outputs.len() != 1 {
                return Err(ChainError::Chain(
                    "a coinbase must have exactly one output".to_string(),
                ));
            }
            if tx.outputs[0].amount > COINBASE_REWARD {
                return Err(ChainError::Chain("Coinbase reward is too large".to_string()));
            }
        }
        if tx.inputs.is_empty() && tx.outputs.is_empty() {
            return Err(ChainError::Chain(
                "a transaction must have at least one input or output".to_string(),
            ));
        }
        for output in &tx.outputs {
            if output.amount < MIN_TRANSACTION_AMOUNT {
                return Err(ChainError::Chain(format!(
                    "output amount below minimum of {}",
                    MIN_TRANSACTION_AMOUNT
                )));
            }
        }
    }

    if coinbase_count > 1 {
        return Err(ChainError::Chain(
            "a block may contain at most one coinbase".to_string(),
        ));
    }
    if txs.len() == 1 && coinbase_count == 1 {
        return Err(ChainError::Chain(
            "Transactions only have one coinbase.".to_string(),
        ));
    }

    let mut seen_references = std::collections::HashSet::new();
    for tx in txs {
        for input in &tx.inputs {
            if !seen_references.insert((input.referenced_hash, input.referenced_output_index)) {
                return Err(ChainError::Chain(
                    "two inputs in this block reference the same output".to_string(),
                ));
            }
        }
    }

    Ok(())
}
