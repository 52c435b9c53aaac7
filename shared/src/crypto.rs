//! RSA-PSS (PKCS#1 v2.1) signing over SHA-256, used to authorize the
//! spending of a transaction output.
//!
//! An address is the DER encoding of an `RsaPublicKey`, hex-encoded for
//! transport. A signature is produced by [`KeyPair::sign`] over a sighash
//! and checked against an address with [`verify_sighash`].

use crate::error::SharedError;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::pss::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

pub type Result<T> = std::result::Result<T, SharedError>;

const KEY_BITS: usize = 2048;

/// An RSA keypair able to sign sighashes and derive its own address.
pub struct KeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl KeyPair {
    /// Generates a fresh 2048-bit RSA keypair.
    pub fn generate() -> Result<Self> {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, KEY_BITS)
            .map_err(|e| SharedError::Cryptographic(e.to_string()))?;
        let public = RsaPublicKey::from(&private);
        Ok(Self { private, public })
    }

    /// The address derived from this keypair's public half: the hex-encoded
    /// DER public key.
    pub fn address(&self) -> Result<String> {
        let der = self
            .public
            .to_public_key_der()
            .map_err(|e| SharedError::Cryptographic(e.to_string()))?;
        Ok(hex::encode(der.as_bytes()))
    }

    /// Signs `message` (typically a 32-byte sighash) with RSA-PSS/SHA-256,
    /// returning the hex-encoded signature.
    pub fn sign(&self, message: &[u8]) -> Result<String> {
        let signing_key = SigningKey::<Sha256>::new(self.private.clone());
        let mut rng = rand::thread_rng();
        let signature = signing_key.sign_with_rng(&mut rng, message);
        Ok(hex::encode(signature.to_bytes()))
    }
}

/// Verifies that `signature_hex` was produced by the holder of `address_hex`
/// over `message`.
pub fn verify_sighash(address_hex: &str, message: &[u8], signature_hex: &str) -> Result<bool> {
    let der = hex::decode(address_hex).map_err(|_| SharedError::InvalidAddress)?;
    let public =
        RsaPublicKey::from_public_key_der(&der).map_err(|_| SharedError::InvalidAddress)?;
    let verifying_key = VerifyingKey::<Sha256>::new(public);

    let sig_bytes = hex::decode(signature_hex).map_err(|_| SharedError::InvalidSignature)?;
    let signature =
        Signature::try_from(sig_bytes.as_slice()).map_err(|_| SharedError::InvalidSignature)?;

    Ok(verifying_key.verify(message, &signature).is_ok())
}

/// Convenience wrapper mirroring [`KeyPair::sign`] for callers that only
/// hold a keypair reference.
pub fn sign_sighash(keypair: &KeyPair, message: &[u8]) -> Result<String> {
    keypair.sign(message)
}
