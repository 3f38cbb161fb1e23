//! RSA keypair generation and parsing

use rand::rngs::OsRng;
use rsa::pkcs1::{
    DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding,
};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{CryptoError, Result};

/// Modulus size for generated keypairs.
pub const RSA_KEY_BITS: usize = 2048;

/// Hex SHA-256 of arbitrary bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Parse a PKCS#1 PEM public key.
pub fn parse_public_key(pem: &str) -> Result<RsaPublicKey> {
    RsaPublicKey::from_pkcs1_pem(pem).map_err(|e| CryptoError::KeyFormat(e.to_string()))
}

/// Parse a PKCS#1 PEM private key.
pub fn parse_private_key(pem: &str) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs1_pem(pem).map_err(|e| CryptoError::KeyFormat(e.to_string()))
}

/// An RSA keypair in PEM form, with the digests the directory advertises.
///
/// The private key never leaves the node; the public PEM is what goes into
/// the node's RRI record.
#[derive(Debug, Clone)]
pub struct RsaKeypair {
    pub public_pem: String,
    pub private_pem: String,
    /// Hex SHA-256 of the public PEM text.
    pub public_key_hash: String,
    /// Hex SHA-256 of the private PEM text.
    pub private_key_hash: String,
    pub key_id: String,
}

impl RsaKeypair {
    /// Generate a fresh 2048-bit keypair.
    pub fn generate() -> Result<Self> {
        let mut rng = OsRng;
        let private = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        let public = RsaPublicKey::from(&private);

        let private_pem = private
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?
            .to_string();
        let public_pem = public
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;

        Ok(Self::from_pems(public_pem, private_pem))
    }

    /// Rebuild a keypair from stored PEM text, recomputing the digests.
    pub fn from_pems(public_pem: impl Into<String>, private_pem: impl Into<String>) -> Self {
        let public_pem = public_pem.into();
        let private_pem = private_pem.into();
        let public_key_hash = sha256_hex(public_pem.as_bytes());
        let private_key_hash = sha256_hex(private_pem.as_bytes());
        Self {
            public_pem,
            private_pem,
            public_key_hash,
            private_key_hash,
            key_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn public_key(&self) -> Result<RsaPublicKey> {
        parse_public_key(&self.public_pem)
    }

    pub fn private_key(&self) -> Result<RsaPrivateKey> {
        parse_private_key(&self.private_pem)
    }

    /// Compare externally supplied digests against the stored ones.
    pub fn compare_hashes(
        &self,
        public_key_hash: Option<&str>,
        private_key_hash: Option<&str>,
    ) -> bool {
        if let Some(h) = public_key_hash {
            if h != self.public_key_hash {
                return false;
            }
        }
        if let Some(h) = private_key_hash {
            if h != self.private_key_hash {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_produces_parseable_pems() {
        let keypair = RsaKeypair::generate().unwrap();
        assert!(keypair.public_pem.contains("BEGIN RSA PUBLIC KEY"));
        assert!(keypair.private_pem.contains("BEGIN RSA PRIVATE KEY"));
        assert!(keypair.public_key().is_ok());
        assert!(keypair.private_key().is_ok());
    }

    #[test]
    fn test_hashes_match_pem_text() {
        let keypair = RsaKeypair::generate().unwrap();
        assert_eq!(
            keypair.public_key_hash,
            sha256_hex(keypair.public_pem.as_bytes())
        );
        assert_eq!(
            keypair.private_key_hash,
            sha256_hex(keypair.private_pem.as_bytes())
        );
        assert_eq!(keypair.public_key_hash.len(), 64);
    }

    #[test]
    fn test_key_id_is_unique() {
        let a = RsaKeypair::generate().unwrap();
        let b = RsaKeypair::from_pems(a.public_pem.clone(), a.private_pem.clone());
        assert_ne!(a.key_id, b.key_id);
    }

    #[test]
    fn test_compare_hashes() {
        let keypair = RsaKeypair::generate().unwrap();
        assert!(keypair.compare_hashes(Some(&keypair.public_key_hash), None));
        assert!(keypair.compare_hashes(
            Some(&keypair.public_key_hash),
            Some(&keypair.private_key_hash)
        ));
        assert!(!keypair.compare_hashes(Some("deadbeef"), None));
        assert!(!keypair.compare_hashes(None, Some("deadbeef")));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_public_key("not a pem").is_err());
        assert!(parse_private_key("not a pem").is_err());
    }

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
