use ledger_shared::{verify_sighash, Hash256, KeyPair};
use serde::{Deserialize, Serialize};

use crate::error::ChainError;

/// A reference to a prior transaction's output, plus the signature
/// authorizing it to be spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    #[serde(rename = "referencedHash")]
    pub referenced_hash: Hash256,
    #[serde(rename = "referencedOutputIndex")]
    pub referenced_output_index: u32,
    pub signature: String,
}

impl TransactionInput {
    /// Concatenation of `referencedHash`, decimal `referencedOutputIndex`
    /// and hex `signature`, with no separator.
    fn serialize(&self) -> String {
        format!(
            "{}{}{}",
            self.referenced_hash, self.referenced_output_index, self.signature
        )
    }
}

/// A credit of `amount` units to `address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub amount: u64,
    pub address: String,
}

impl TransactionOutput {
    /// Concatenation of decimal `amount` and hex `address`, no separator.
    fn serialize(&self) -> String {
        format!("{}{}", self.amount, self.address)
    }
}

fn serialize_outputs(outputs: &[TransactionOutput]) -> String {
    outputs
        .iter()
        .map(TransactionOutput::serialize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// An input/output pair bound together by a timestamp and a hash derived
/// from the rest of the fields. A transaction with no inputs and exactly
/// one output is a coinbase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub timestamp: f64,
    pub hash: Hash256,
}

impl Transaction {
    /// Builds a transaction from its inputs/outputs/timestamp, computing
    /// `hash` rather than accepting one from the caller.
    pub fn new(inputs: Vec<TransactionInput>, outputs: Vec<TransactionOutput>, timestamp: f64) -> Self {
        let hash = compute_transaction_hash(&inputs, &outputs, timestamp);
        Self {
            inputs,
            outputs,
            timestamp,
            hash,
        }
    }

    /// Builds a coinbase transaction minting `amount` to `address`.
    pub fn coinbase(address: String, amount: u64, timestamp: f64) -> Self {
        Self::new(Vec::new(), vec![TransactionOutput { amount, address }], timestamp)
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty() && self.outputs.len() == 1
    }

    /// Recomputes the hash from this transaction's current fields.
    pub fn recompute_hash(&self) -> Hash256 {
        compute_transaction_hash(&self.inputs, &self.outputs, self.timestamp)
    }

    /// True when the stored `hash` matches the recomputed hash.
    pub fn has_valid_hash(&self) -> bool {
        self.hash == self.recompute_hash()
    }

    /// Builds and signs a transaction spending the given prior outputs.
    ///
    /// Each source pairs the referenced transaction hash and output index
    /// with the keypair authorized to spend it.
    pub fn new_signed(
        sources: &[(Hash256, u32, &KeyPair)],
        outputs: Vec<TransactionOutput>,
        timestamp: f64,
    ) -> Result<Self, ChainError> {
        let mut inputs = Vec::with_capacity(sources.len());
        for (referenced_hash, referenced_output_index, keypair) in sources {
            let sighash = compute_sighash(*referenced_hash, *referenced_output_index, &outputs);
            let signature = keypair
                .sign(sighash.as_bytes())
                .map_err(|e| ChainError::Utxo(e.to_string()))?;
            inputs.push(TransactionInput {
                referenced_hash: *referenced_hash,
                referenced_output_index: *referenced_output_index,
                signature,
            });
        }
        Ok(Self::new(inputs, outputs, timestamp))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses a transaction from JSON, rejecting it if the carried `hash`
    /// does not match the hash recomputed from its fields.
    pub fn from_json(s: &str) -> Result<Self, ChainError> {
        let tx: Transaction =
            serde_json::from_str(s).map_err(|e| ChainError::Block(e.to_string()))?;
        if !tx.has_valid_hash() {
            return Err(ChainError::Block(
                "transaction hash does not match its fields".to_string(),
            ));
        }
        Ok(tx)
    }
}

fn compute_transaction_hash(
    inputs: &[TransactionInput],
    outputs: &[TransactionOutput],
    timestamp: f64,
) -> Hash256 {
    let serialized_inputs = inputs
        .iter()
        .map(TransactionInput::serialize)
        .collect::<Vec<_>>()
        .join(" ");
    let preimage = format!(
        "{}-{}-{}",
        serialized_inputs,
        serialize_outputs(outputs),
        timestamp
    );
    Hash256::sha256(preimage.as_bytes())
}

/// `SHA256(referencedHash || decimal(referencedOutputIndex) || serialize_all(outputs))`.
///
/// Binds a spending input to the full output list of its containing
/// transaction, preventing output substitution.
pub fn compute_sighash(
    referenced_hash: Hash256,
    referenced_output_index: u32,
    spending_outputs: &[TransactionOutput],
) -> Hash256 {
    let preimage = format!(
        "{}{}{}",
        referenced_hash,
        referenced_output_index,
        serialize_outputs(spending_outputs)
    );
    Hash256::sha256(preimage.as_bytes())
}

/// Verifies input `input_index` of `spending` against the transaction it
/// references, `referenced`.
pub fn verify_transaction_input(
    referenced: &Transaction,
    spending: &Transaction,
    input_index: usize,
) -> Result<(), ChainError> {
    let input = &spending.inputs[input_index];
    let index = input.referenced_output_index as usize;

    let referenced_output = referenced
        .outputs
        .get(index)
        .ok_or_else(|| ChainError::Utxo("Referenced output index is out of bounds.".to_string()))?;

    if referenced.hash != input.referenced_hash {
        return Err(ChainError::Utxo(
            "Referenced transaction hash does not match.".to_string(),
        ));
    }

    let sighash = compute_sighash(input.referenced_hash, input.referenced_output_index, &spending.outputs);
    let ok = verify_sighash(&referenced_output.address, sighash.as_bytes(), &input.signature)
        .map_err(|e| ChainError::Utxo(e.to_string()))?;
    if !ok {
        return Err(ChainError::Utxo("Signature is not valid.".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coinbase_has_no_inputs_and_one_output() {
        let tx = Transaction::coinbase("deadbeef".to_string(), 1000, 1.0);
        assert!(tx.is_coinbase());
        assert!(tx.has_valid_hash());
    }

    #[test]
    fn hash_changes_when_any_field_changes() {
        let tx = Transaction::coinbase("deadbeef".to_string(), 1000, 1.0);
        let mut mutated = tx.clone();
        mutated.outputs[0].amount = 999;
        assert_ne!(tx.recompute_hash(), mutated.recompute_hash());
    }

    #[test]
    fn signed_spend_verifies_against_referenced_output() {
        let signer = KeyPair::generate().unwrap();
        let address = signer.address().unwrap();
        let funding = Transaction::coinbase(address, 1000, 1.0);

        let recipient = KeyPair::generate().unwrap().address().unwrap();
        let spend = Transaction::new_signed(
            &[(funding.hash, 0, &signer)],
            vec![TransactionOutput {
                amount: 1000,
                address: recipient,
            }],
            2.0,
        )
        .unwrap();

        verify_transaction_input(&funding, &spend, 0).unwrap();
    }

    #[test]
    fn rejects_signature_from_the_wrong_key() {
        let owner = KeyPair::generate().unwrap();
        let impostor = KeyPair::generate().unwrap();
        let address = owner.address().unwrap();
        let funding = Transaction::coinbase(address, 1000, 1.0);

        let recipient = KeyPair::generate().unwrap().address().unwrap();
        // Sign with the impostor's key but claim to spend the owner's output.
        let forged = Transaction::new_signed(
            &[(funding.hash, 0, &impostor)],
            vec![TransactionOutput {
                amount: 1000,
                address: recipient,
            }],
            2.0,
        )
        .unwrap();

        let err = verify_transaction_input(&funding, &forged, 0).unwrap_err();
        assert!(matches!(err, ChainError::Utxo(_)));
    }

    #[test]
    fn json_round_trip_rejects_tampering() {
        let tx = Transaction::coinbase("deadbeef".to_string(), 1000, 1.0);
        let json = tx.to_json().unwrap();
        let parsed = Transaction::from_json(&json).unwrap();
        assert_eq!(tx, parsed);

        let tampered = json.replace("1000", "1001");
        assert!(Transaction::from_json(&tampered).is_err());
    }
}
