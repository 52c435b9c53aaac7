/// Leading hex zeros a block hash must have to satisfy proof of work.
pub const DIFFICULTY: usize = 1;

/// Outputs below this amount are rejected by the syntactic validator.
pub const MIN_TRANSACTION_AMOUNT: u64 = 1;

/// Maximum amount a coinbase output may mint.
pub const COINBASE_REWARD: u64 = 50;

/// Inclusive upper bound on the number of transactions in a block.
pub const MAX_TRANSACTIONS_PER_BLOCK: usize = 1_000;

/// Fixed timestamp of the genesis block.
pub const GENESIS_TIMESTAMP: f64 = 1_514_689_482.0;

/// Amount minted by the genesis coinbase.
pub const GENESIS_AMOUNT: u64 = 1000;

/// Hex-encoded DER public key that owns the genesis output, shipped
/// alongside the engine rather than generated at runtime.
pub const GENESIS_ADDRESS_HEX: &str = include_str!("../assets/genesis_address.hex");
