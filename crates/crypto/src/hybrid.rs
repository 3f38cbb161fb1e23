//! Hybrid RSA + Fernet envelope
//!
//! Each call generates a single-use session key, seals the plaintext with
//! it, and wraps the key's base64 form under the recipient's RSA public
//! key. The `_with_hash` variant also returns the hex SHA-256 of the
//! plaintext for terminal-hop verification.

use rand::rngs::OsRng;
use rsa::Pkcs1v15Encrypt;

use crate::fernet::SessionKey;
use crate::keys::{parse_private_key, parse_public_key, sha256_hex};
use crate::{CryptoError, Result};

/// Encrypt UTF-8 plaintext for the holder of `public_pem`.
///
/// Returns `(fernet_token, rsa_wrapped_session_key)`.
pub fn hybrid_encrypt(plaintext: &str, public_pem: &str) -> Result<(String, Vec<u8>)> {
    let session_key = SessionKey::generate();
    let token = session_key.encrypt(plaintext.as_bytes())?;

    let public_key = parse_public_key(public_pem)?;
    let mut rng = OsRng;
    let wrapped = public_key
        .encrypt(
            &mut rng,
            Pkcs1v15Encrypt,
            session_key.to_base64().as_bytes(),
        )
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok((token, wrapped))
}

/// As [`hybrid_encrypt`], additionally returning the hex SHA-256 of the
/// original plaintext.
pub fn hybrid_encrypt_with_hash(
    plaintext: &str,
    public_pem: &str,
) -> Result<(String, String, Vec<u8>)> {
    let (token, wrapped) = hybrid_encrypt(plaintext, public_pem)?;
    let message_hash = sha256_hex(plaintext.as_bytes());
    Ok((token, message_hash, wrapped))
}

/// Invert [`hybrid_encrypt`] with the private half of the keypair.
pub fn hybrid_decrypt(token: &str, private_pem: &str, wrapped_key: &[u8]) -> Result<String> {
    let private_key = parse_private_key(private_pem)?;
    let key_b64 = private_key
        .decrypt(Pkcs1v15Encrypt, wrapped_key)
        .map_err(|e| CryptoError::Decryption(e.to_string()))?;
    let key_b64 = String::from_utf8(key_b64)
        .map_err(|_| CryptoError::Decryption("wrapped key is not UTF-8".to_string()))?;

    let session_key = SessionKey::from_base64(&key_b64)?;
    let plaintext = session_key.decrypt(token)?;
    String::from_utf8(plaintext)
        .map_err(|_| CryptoError::Decryption("plaintext is not UTF-8".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::RsaKeypair;

    #[test]
    fn test_hybrid_roundtrip() {
        let keypair = RsaKeypair::generate().unwrap();
        let (token, wrapped) = hybrid_encrypt("hello onion", &keypair.public_pem).unwrap();
        let plaintext = hybrid_decrypt(&token, &keypair.private_pem, &wrapped).unwrap();
        assert_eq!(plaintext, "hello onion");
    }

    #[test]
    fn test_with_hash_returns_plaintext_digest() {
        let keypair = RsaKeypair::generate().unwrap();
        let (_, hash, _) = hybrid_encrypt_with_hash("hello", &keypair.public_pem).unwrap();
        assert_eq!(
            hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_wrong_private_key_fails() {
        let keypair = RsaKeypair::generate().unwrap();
        let other = RsaKeypair::generate().unwrap();
        let (token, wrapped) = hybrid_encrypt("secret", &keypair.public_pem).unwrap();
        assert!(hybrid_decrypt(&token, &other.private_pem, &wrapped).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails_integrity() {
        let keypair = RsaKeypair::generate().unwrap();
        let (token, wrapped) = hybrid_encrypt("secret", &keypair.public_pem).unwrap();

        use base64::engine::general_purpose::URL_SAFE;
        use base64::Engine as _;
        let mut raw = URL_SAFE.decode(&token).unwrap();
        let mid = raw.len() / 2;
        raw[mid] ^= 0xFF;
        let tampered = URL_SAFE.encode(raw);

        assert!(matches!(
            hybrid_decrypt(&tampered, &keypair.private_pem, &wrapped),
            Err(CryptoError::Integrity)
        ));
    }

    #[test]
    fn test_bad_public_pem_is_key_format_error() {
        assert!(matches!(
            hybrid_encrypt("data", "not a pem"),
            Err(CryptoError::KeyFormat(_))
        ));
    }

    #[test]
    fn test_each_layer_gets_fresh_session_key() {
        let keypair = RsaKeypair::generate().unwrap();
        let (token_a, wrapped_a) = hybrid_encrypt("same", &keypair.public_pem).unwrap();
        let (token_b, wrapped_b) = hybrid_encrypt("same", &keypair.public_pem).unwrap();
        assert_ne!(token_a, token_b);
        assert_ne!(wrapped_a, wrapped_b);
    }
}
