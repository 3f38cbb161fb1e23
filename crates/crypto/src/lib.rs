//! VeilNet cryptography
//!
//! The hybrid envelope used by the onion chain: a fresh 256-bit session
//! key authenticates and encrypts each layer (AES-128-CBC + HMAC-SHA256,
//! encrypt-then-MAC, Fernet token layout), and the layer's recipient RSA
//! key wraps the session key (PKCS#1 v1.5, matching the directory
//! protocol). Integrity of the original plaintext is additionally carried
//! as a SHA-256 digest for terminal-hop verification.

mod fernet;
mod hybrid;
mod keys;

pub use fernet::{SessionKey, SESSION_KEY_LEN};
pub use hybrid::{hybrid_decrypt, hybrid_encrypt, hybrid_encrypt_with_hash};
pub use keys::{parse_private_key, parse_public_key, sha256_hex, RsaKeypair, RSA_KEY_BITS};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Key format error: {0}")]
    KeyFormat(String),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Integrity check failed")]
    Integrity,

    #[error("Plaintext too large: {0} bytes")]
    Size(usize),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
