//! Session keys and the Fernet token envelope
//!
//! Token layout: `0x80 || timestamp_be_u64 || iv[16] || ciphertext || hmac[32]`,
//! base64url-encoded. The 32-byte session key splits into a 16-byte HMAC
//! key and a 16-byte AES key; encryption is AES-128-CBC with PKCS#7
//! padding, authenticated encrypt-then-MAC with HMAC-SHA256 over
//! everything before the tag.

use std::time::{SystemTime, UNIX_EPOCH};

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::{CryptoError, Result};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type HmacSha256 = Hmac<Sha256>;

/// Raw session key length in bytes.
pub const SESSION_KEY_LEN: usize = 32;

const TOKEN_VERSION: u8 = 0x80;
const IV_LEN: usize = 16;
const MAC_LEN: usize = 32;
const HEADER_LEN: usize = 1 + 8 + IV_LEN;

/// One layer's plaintext is bounded; anything larger is a caller bug, not
/// a packet.
const MAX_PLAINTEXT: usize = 16 * 1024 * 1024;

/// A single-use symmetric session key.
///
/// Serialized as a base64url string for transit inside the RSA wrap.
#[derive(Clone)]
pub struct SessionKey {
    bytes: [u8; SESSION_KEY_LEN],
}

impl SessionKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SESSION_KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn from_bytes(bytes: [u8; SESSION_KEY_LEN]) -> Self {
        Self { bytes }
    }

    pub fn to_base64(&self) -> String {
        URL_SAFE.encode(self.bytes)
    }

    pub fn from_base64(encoded: &str) -> Result<Self> {
        let decoded = URL_SAFE
            .decode(encoded.trim())
            .map_err(|e| CryptoError::KeyFormat(format!("bad session key base64: {e}")))?;
        let bytes: [u8; SESSION_KEY_LEN] = decoded
            .try_into()
            .map_err(|_| CryptoError::KeyFormat("session key must be 32 bytes".to_string()))?;
        Ok(Self { bytes })
    }

    fn signing_key(&self) -> [u8; 16] {
        let mut key = [0u8; 16];
        key.copy_from_slice(&self.bytes[..16]);
        key
    }

    fn encryption_key(&self) -> [u8; 16] {
        let mut key = [0u8; 16];
        key.copy_from_slice(&self.bytes[16..]);
        key
    }

    /// Seal plaintext into a base64url token.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        if plaintext.len() > MAX_PLAINTEXT {
            return Err(CryptoError::Size(plaintext.len()));
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let ciphertext = Aes128CbcEnc::new(&self.encryption_key().into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut token = Vec::with_capacity(HEADER_LEN + ciphertext.len() + MAC_LEN);
        token.push(TOKEN_VERSION);
        token.extend_from_slice(&timestamp.to_be_bytes());
        token.extend_from_slice(&iv);
        token.extend_from_slice(&ciphertext);

        let mut mac = HmacSha256::new_from_slice(&self.signing_key())
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;
        mac.update(&token);
        token.extend_from_slice(&mac.finalize().into_bytes());

        Ok(URL_SAFE.encode(token))
    }

    /// Open a token, verifying the MAC before touching the ciphertext.
    pub fn decrypt(&self, token: &str) -> Result<Vec<u8>> {
        let raw = URL_SAFE
            .decode(token.trim())
            .map_err(|e| CryptoError::Decryption(format!("bad token base64: {e}")))?;

        if raw.len() < HEADER_LEN + MAC_LEN {
            return Err(CryptoError::Decryption("token too short".to_string()));
        }
        if raw[0] != TOKEN_VERSION {
            return Err(CryptoError::Decryption(format!(
                "unknown token version {:#04x}",
                raw[0]
            )));
        }

        let (signed, tag) = raw.split_at(raw.len() - MAC_LEN);
        let mut mac = HmacSha256::new_from_slice(&self.signing_key())
            .map_err(|e| CryptoError::Decryption(e.to_string()))?;
        mac.update(signed);
        mac.verify_slice(tag).map_err(|_| CryptoError::Integrity)?;

        let iv: [u8; IV_LEN] = signed[9..HEADER_LEN]
            .try_into()
            .map_err(|_| CryptoError::Decryption("bad IV".to_string()))?;
        let ciphertext = &signed[HEADER_LEN..];

        Aes128CbcDec::new(&self.encryption_key().into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CryptoError::Integrity)
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material
        write!(f, "SessionKey(..)")
    }
}
