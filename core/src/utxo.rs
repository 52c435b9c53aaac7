use std::collections::{HashMap, HashSet};

use ledger_shared::Hash256;
use serde::{Deserialize, Serialize};

use crate::transaction::{verify_transaction_input, Transaction};

/// Maps a transaction hash to that transaction and the set of its output
/// indices that remain unspent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UtxoManager {
    entries: HashMap<Hash256, (Transaction, HashSet<u32>)>,
}

impl UtxoManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, hash: &Hash256) -> Option<&(Transaction, HashSet<u32>)> {
        self.entries.get(hash)
    }

    /// Checks, without mutating state, whether `tx` may be applied: every
    /// input references an unspent output, carries a valid signature, and
    /// (unless `tx` is a coinbase) input amounts balance output amounts.
    pub fn can_spend(&self, tx: &Transaction) -> Result<(), String> {
        let is_coinbase = tx.is_coinbase();
        let mut input_amount: u64 = 0;

        for (index, input) in tx.inputs.iter().enumerate() {
            let (referenced, unspent) = self
                .entries
                .get(&input.referenced_hash)
                .ok_or_else(|| "Referenced UTXO does not exist.".to_string())?;

            if !unspent.contains(&input.referenced_output_index) {
                return Err("Referenced UTXO does not exist.".to_string());
            }

            verify_transaction_input(referenced, tx, index).map_err(|e| e.to_string())?;

            let amount = referenced.outputs[input.referenced_output_index as usize].amount;
            input_amount = input_amount
                .checked_add(amount)
                .ok_or_else(|| "Input amount overflow.".to_string())?;
        }

        let output_amount = tx
            .outputs
            .iter()
            .try_fold(0u64, |acc, o| acc.checked_add(o.amount))
            .ok_or_else(|| "Output amount overflow.".to_string())?;

        if !is_coinbase && input_amount != output_amount {
            return Err("Input amounts to do not match output amounts".to_string());
        }

        Ok(())
    }

    /// Applies `tx`, assuming the caller already validated it via
    /// [`UtxoManager::can_spend`].
    pub fn spend(&mut self, tx: &Transaction) -> Result<(), String> {
        for input in &tx.inputs {
            let (_, unspent) = self
                .entries
                .get_mut(&input.referenced_hash)
                .ok_or_else(|| "Referenced UTXO does not exist.".to_string())?;
            if !unspent.remove(&input.referenced_output_index) {
                return Err("Referenced UTXO does not exist.".to_string());
            }
        }

        let unspent_outputs = (0..tx.outputs.len() as u32).collect();
        self.entries.insert(tx.hash, (tx.clone(), unspent_outputs));
        Ok(())
    }

    /// Inverse of [`UtxoManager::spend`]. Requires `tx`'s entry to exist
    /// with a full unspent set, i.e. nothing was consumed downstream.
    pub fn revert(&mut self, tx: &Transaction) -> Result<(), String> {
        self.entries
            .remove(&tx.hash)
            .ok_or_else(|| "Cannot revert a transaction with no UTXO entry.".to_string())?;

        for input in &tx.inputs {
            let (_, unspent) = self
                .entries
                .get_mut(&input.referenced_hash)
                .ok_or_else(|| "Cannot revert: referenced transaction is gone.".to_string())?;
            if !unspent.insert(input.referenced_output_index) {
                return Err("Double revert: output was already unspent.".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionOutput;
    use ledger_shared::KeyPair;

    fn address() -> (KeyPair, String) {
        let kp = KeyPair::generate().unwrap();
        let addr = kp.address().unwrap();
        (kp, addr)
    }

    #[test]
    fn three_independent_coinbases_all_spendable() {
        let mut manager = UtxoManager::new();
        let (_, a1) = address();
        let (_, a2) = address();
        let (_, a3) = address();

        let tx1 = Transaction::coinbase(a1, 1000, 1.0);
        let tx2 = Transaction::coinbase(a2, 1000, 1.0);
        let tx3 = Transaction::coinbase(a3, 1000, 1.0);

        manager.can_spend(&tx1).unwrap();
        manager.can_spend(&tx2).unwrap();
        manager.can_spend(&tx3).unwrap();

        manager.spend(&tx1).unwrap();
        manager.spend(&tx2).unwrap();
        manager.spend(&tx3).unwrap();

        assert!(manager.entry(&tx1.hash).is_some());
    }

    #[test]
    fn chained_spend_and_revert_tracks_balances() {
        let mut manager = UtxoManager::new();
        let (k1, a1) = address();
        let (k2, a2) = address();
        let (_k3, a3) = address();

        let tx1 = Transaction::coinbase(a1, 1000, 1.0);
        manager.spend(&tx1).unwrap();

        // 1 gives 500 to 2, 500 back to 1.
        let tx2 = Transaction::new_signed(
            &[(tx1.hash, 0, &k1)],
            vec![
                TransactionOutput {
                    amount: 500,
                    address: a2.clone(),
                },
                TransactionOutput {
                    amount: 500,
                    address: a1,
                },
            ],
            2.0,
        )
        .unwrap();
        manager.can_spend(&tx2).unwrap();
        manager.spend(&tx2).unwrap();

        // 2 spends its 500 to 3.
        let tx3 = Transaction::new_signed(
            &[(tx2.hash, 0, &k2)],
            vec![TransactionOutput {
                amount: 500,
                address: a3,
            }],
            3.0,
        )
        .unwrap();
        manager.can_spend(&tx3).unwrap();
        manager.spend(&tx3).unwrap();

        // Reverting tx3 should put 2's output back as unspent.
        manager.revert(&tx3).unwrap();
        let (_, unspent) = manager.entry(&tx2.hash).unwrap();
        assert!(unspent.contains(&0));
    }

    #[test]
    fn rejects_double_spend_of_the_same_output() {
        let mut manager = UtxoManager::new();
        let (k1, a1) = address();
        let (_, a2) = address();

        let tx1 = Transaction::coinbase(a1, 1000, 1.0);
        manager.spend(&tx1).unwrap();

        let spend_once = Transaction::new_signed(
            &[(tx1.hash, 0, &k1)],
            vec![TransactionOutput {
                amount: 1000,
                address: a2.clone(),
            }],
            2.0,
        )
        .unwrap();
        manager.spend(&spend_once).unwrap();

        let spend_again = Transaction::new_signed(
            &[(tx1.hash, 0, &k1)],
            vec![TransactionOutput {
                amount: 1000,
                address: a2,
            }],
            3.0,
        )
        .unwrap();
        assert!(manager.can_spend(&spend_again).is_err());
    }

    #[test]
    fn rejects_unbalanced_non_coinbase_transaction() {
        let mut manager = UtxoManager::new();
        let (k1, a1) = address();
        let (_, a2) = address();

        let tx1 = Transaction::coinbase(a1, 1000, 1.0);
        manager.spend(&tx1).unwrap();

        let overspend = Transaction::new_signed(
            &[(tx1.hash, 0, &k1)],
            vec![TransactionOutput {
                amount: 2000,
                address: a2,
            }],
            2.0,
        )
        .unwrap();
        let err = manager.can_spend(&overspend).unwrap_err();
        assert_eq!(err, "Input amounts to do not match output amounts");
    }
}
