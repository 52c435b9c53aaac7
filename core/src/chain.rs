use std::collections::HashMap;

use ledger_shared::Hash256;
use tracing::{info, warn};

use crate::block::{verify_next_block, Block};
use crate::constants::GENESIS_ADDRESS_HEX;
use crate::error::ChainError;
use crate::utxo::UtxoManager;

/// All accepted blocks across every branch, the tip of the active branch,
/// and the UTXO state produced by replaying genesis→head.
///
/// `blocks` retains every block ever accepted, including side branches that
/// lost a reorg race; only the path from genesis to `head` is reflected in
/// `utxo`.
#[derive(Debug, Clone)]
pub struct Chain {
    blocks: HashMap<Hash256, Block>,
    head_hash: Hash256,
    utxo: UtxoManager,
}

impl Chain {
    /// Starts a fresh chain at the shipped production genesis block.
    pub fn new() -> Self {
        Self::with_genesis(Block::genesis())
    }

    /// Starts a fresh chain at a genesis block crediting `address` instead
    /// of the production genesis address. Lets a caller who holds the
    /// matching private key exercise spending the genesis coinbase, which
    /// the shipped production address can never do since its private key
    /// is intentionally not part of this engine.
    pub fn with_genesis_address(address: String) -> Self {
        Self::with_genesis(Block::genesis_with_address(address))
    }

    fn with_genesis(genesis: Block) -> Self {
        let mut utxo = UtxoManager::new();
        let coinbase = &genesis.transactions[0];
        utxo.spend(coinbase)
            .expect("genesis coinbase is always spendable into an empty UTXO");

        let head_hash = genesis.hash;
        let mut blocks = HashMap::new();
        blocks.insert(head_hash, genesis);

        Self {
            blocks,
            head_hash,
            utxo,
        }
    }

    pub fn head(&self) -> &Block {
        self.blocks
            .get(&self.head_hash)
            .expect("head_hash always names a block in blocks")
    }

    pub fn get_block(&self, hash: &Hash256) -> Option<&Block> {
        self.blocks.get(hash)
    }

    pub fn utxo(&self) -> &UtxoManager {
        &self.utxo
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    fn parent_of(&self, block: &Block) -> Result<Block, ChainError> {
        let parent_hash = Hash256::from_hex(&block.previous_hash)
            .map_err(|_| ChainError::NoParent)?;
        self.blocks.get(&parent_hash).cloned().ok_or(ChainError::NoParent)
    }

    /// Accepts `block` if it links to a known parent and passes
    /// [`verify_next_block`]. The block is always persisted in `blocks`
    /// once validated, regardless of whether it extends the active branch;
    /// `head`/`utxo` are updated only when it becomes the new best branch.
    pub fn add_block(&mut self, block: Block) -> Result<(), ChainError> {
        if self.blocks.contains_key(&block.hash) {
            return Err(ChainError::DuplicateBlock);
        }

        let parent_hash = Hash256::from_hex(&block.previous_hash).map_err(|_| ChainError::NoParent)?;
        let parent = self.blocks.get(&parent_hash).cloned().ok_or(ChainError::NoParent)?;

        verify_next_block(&parent, &block)?;

        let block_hash = block.hash;
        let block_index = block.index;
        self.blocks.insert(block_hash, block);

        if block_index > self.head().index {
            self.update_utxo_and_head(block_hash)?;
        }
        Ok(())
    }

    /// Sequentially applies [`Chain::add_block`] to each element of
    /// `blocks`. On the first failure, every block added during this call
    /// (and any head/UTXO changes it produced) is rolled back as a single
    /// unit and the failure is returned.
    pub fn add_blocks(&mut self, blocks: Vec<Block>) -> Result<(), ChainError> {
        let head_before = self.head_hash;
        let utxo_before = self.utxo.clone();
        let mut inserted = Vec::new();

        for block in blocks {
            let hash = block.hash;
            match self.add_block(block) {
                Ok(()) => inserted.push(hash),
                Err(e) => {
                    for h in inserted {
                        self.blocks.remove(&h);
                    }
                    self.head_hash = head_before;
                    self.utxo = utxo_before;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Computes the least common ancestor of `self.head()` and `new_block`
    /// by walking parent pointers in lockstep, returning `(old_chain,
    /// new_chain)` youngest-first and excluding the ancestor itself.
    ///
    /// Precondition: `new_block.index == self.head().index + 1`, which the
    /// caller (`update_utxo_and_head`) has already established.
    fn branch_chains(&self, new_block: &Block) -> Result<(Vec<Block>, Vec<Block>), ChainError> {
        let mut new_chain = vec![new_block.clone()];
        let mut cursor_new = self.parent_of(new_block)?;
        let mut cursor_old = self.head().clone();
        let mut old_chain = Vec::new();

        while cursor_new.hash != cursor_old.hash {
            new_chain.push(cursor_new.clone());
            old_chain.push(cursor_old.clone());
            cursor_new = self.parent_of(&cursor_new)?;
            cursor_old = self.parent_of(&cursor_old)?;
        }

        Ok((old_chain, new_chain))
    }

    /// Switches `head` to `new_head_hash`, reverting the old branch's
    /// transactions and applying the new branch's, with full rollback on
    /// any UTXO failure partway through the new branch.
    fn update_utxo_and_head(&mut self, new_head_hash: Hash256) -> Result<(), ChainError> {
        let new_block = self
            .blocks
            .get(&new_head_hash)
            .cloned()
            .expect("just inserted by add_block");

        if new_block.index != self.head().index + 1 {
            return Err(ChainError::Chain(
                "a reorg target must extend the current head by exactly one index".to_string(),
            ));
        }

        let (old_chain, new_chain) = self.branch_chains(&new_block)?;
        if old_chain.len() > 1 {
            info!(
                depth = old_chain.len(),
                new_head = %new_head_hash,
                "reorganizing to a competing branch"
            );
        }

        // Revert phase: oldChain is youngest-first; within each block,
        // transactions revert in reverse order since later transactions
        // may consume outputs produced earlier in the same block.
        for block in &old_chain {
            for tx in block.transactions.iter().rev() {
                self.utxo.revert(tx).map_err(ChainError::Utxo)?;
            }
        }

        // Apply phase: oldest-first, i.e. newChain reversed.
        let oldest_first: Vec<&Block> = new_chain.iter().rev().collect();
        let mut applied_youngest_first_indices: Vec<usize> = Vec::new();
        let mut failure: Option<(usize, String)> = None;

        'apply: for (position, block) in oldest_first.iter().enumerate() {
            let youngest_first_index = new_chain.len() - 1 - position;
            for (tx_index, tx) in block.transactions.iter().enumerate() {
                match self.utxo.can_spend(tx) {
                    Ok(()) => {
                        self.utxo
                            .spend(tx)
                            .expect("spend after a successful can_spend always succeeds");
                    }
                    Err(reason) => {
                        for already_applied in block.transactions[..tx_index].iter().rev() {
                            self.utxo
                                .revert(already_applied)
                                .expect("reverting a transaction applied earlier in this block must succeed");
                        }
                        failure = Some((youngest_first_index, reason));
                        break 'apply;
                    }
                }
            }
            applied_youngest_first_indices.push(youngest_first_index);
        }

        if let Some((failed_index, reason)) = failure {
            for &youngest_first_index in applied_youngest_first_indices.iter().rev() {
                for tx in new_chain[youngest_first_index].transactions.iter().rev() {
                    self.utxo
                        .revert(tx)
                        .expect("reverting a successfully applied block during rollback must succeed");
                }
            }

            for discarded in &new_chain[..=failed_index] {
                self.blocks.remove(&discarded.hash);
            }

            for block in old_chain.iter().rev() {
                for tx in &block.transactions {
                    self.utxo
                        .spend(tx)
                        .expect("re-applying a previously valid chain must succeed");
                }
            }

            warn!(reason = %reason, "reorg failed, candidate branch discarded and UTXO rolled back");
            return Err(ChainError::Utxo(reason));
        }

        self.head_hash = new_head_hash;
        Ok(())
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

/// The shipped, non-spendable production genesis address. Exposed so
/// callers can recognize outputs that credit it.
pub fn production_genesis_address() -> &'static str {
    GENESIS_ADDRESS_HEX
}
