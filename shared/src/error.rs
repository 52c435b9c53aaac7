use thiserror::Error;

/// Errors from the hashing and signing primitives in this crate.
#[derive(Error, Debug)]
pub enum SharedError {
    #[error("address is not a valid DER-encoded RSA public key")]
    InvalidAddress,

    #[error("signature is not valid hex")]
    InvalidSignature,

    #[error("cryptographic operation failed: {0}")]
    Cryptographic(String),
}
