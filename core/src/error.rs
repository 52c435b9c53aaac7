use ledger_shared::SharedError;
use thiserror::Error;

/// Errors surfaced by the block, transaction and chain validators.
///
/// Names mirror the conditions they guard: a malformed block is a
/// [`ChainError::Block`], a structurally sound block that cannot extend the
/// chain it was offered to is a [`ChainError::Chain`], and so on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// A block or transaction failed a syntactic or hash-integrity check.
    #[error("invalid block: {0}")]
    Block(String),

    /// A structurally valid block could not be attached to the chain it was
    /// offered to, or the resulting reorganization was itself invalid.
    #[error("invalid chain transition: {0}")]
    Chain(String),

    /// No existing block matches the offered block's `previous_hash`.
    #[error("no parent block for this block's previousHash")]
    NoParent,

    /// A block with this hash has already been accepted.
    #[error("duplicate block")]
    DuplicateBlock,

    /// A transaction could not be validated or applied against the UTXO set.
    #[error("invalid transaction: {0}")]
    Utxo(String),
}

impl From<SharedError> for ChainError {
    fn from(err: SharedError) -> Self {
        ChainError::Utxo(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChainError>;
