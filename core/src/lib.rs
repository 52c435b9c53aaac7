pub mod block;
pub mod chain;
pub mod constants;
pub mod error;
pub mod miner;
pub mod transaction;
pub mod utxo;

pub use block::{verify_next_block, verify_transactions_syntax, Block};
pub use chain::{production_genesis_address, Chain};
pub use constants::{
    COINBASE_REWARD, DIFFICULTY, GENESIS_ADDRESS_HEX, GENESIS_AMOUNT, GENESIS_TIMESTAMP,
    MAX_TRANSACTIONS_PER_BLOCK, MIN_TRANSACTION_AMOUNT,
};
pub use error::{ChainError, Result};
pub use miner::{generate_next_block, generate_next_block_cancellable};
pub use transaction::{compute_sighash, Transaction, TransactionInput, TransactionOutput};
pub use utxo::UtxoManager;

pub use ledger_shared::{Hash256, HashParseError, KeyPair, SharedError};
