// src/encryption.rs
//! At-rest encryption adapter. Wraps a collection's user fields with AES-256-GCM,
//! keyed by the SHA-256 digest of the configured key, one fresh random IV per call.

use crate::error::{MongoLiteError, Result};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use sha2::{Digest, Sha256};

pub struct Encryptor {
    cipher: Aes256Gcm,
}

impl Encryptor {
    /// Derive a 256-bit key from `key` via SHA-256 and build the cipher.
    pub fn new(key: &str) -> Self {
        let digest = Sha256::digest(key.as_bytes());
        let cipher = Aes256Gcm::new_from_slice(&digest)
            .expect("SHA-256 digest is always 32 bytes, the required AES-256 key length");
        Encryptor { cipher }
    }

    /// Encrypt `plaintext`, returning the on-disk `iv:ciphertext` hex string.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        let mut iv_bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut iv_bytes);
        let nonce = Nonce::from_slice(&iv_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| MongoLiteError::Encryption(e.to_string()))?;

        Ok(format!("{}:{}", hex::encode(iv_bytes), hex::encode(ciphertext)))
    }

    /// Decrypt a `iv:ciphertext` hex string produced by [`Self::encrypt`].
    pub fn decrypt(&self, stored: &str) -> Result<Vec<u8>> {
        let (iv_hex, ciphertext_hex) = stored
            .split_once(':')
            .ok_or_else(|| MongoLiteError::Encryption("malformed ciphertext envelope".to_string()))?;

        let iv_bytes = hex::decode(iv_hex)
            .map_err(|e| MongoLiteError::Encryption(format!("invalid iv encoding: {}", e)))?;
        if iv_bytes.len() != 12 {
            return Err(MongoLiteError::Encryption("invalid iv length".to_string()));
        }
        let ciphertext = hex::decode(ciphertext_hex)
            .map_err(|e| MongoLiteError::Encryption(format!("invalid ciphertext encoding: {}", e)))?;

        let nonce = Nonce::from_slice(&iv_bytes);
        self.cipher
            .decrypt(nonce, ciphertext.as_ref())
            .map_err(|_| MongoLiteError::Encryption("decryption failed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_encrypt_decrypt() {
        let enc = Encryptor::new("correct horse battery staple");
        let stored = enc.encrypt(b"secret payload").unwrap();
        let recovered = enc.decrypt(&stored).unwrap();
        assert_eq!(recovered, b"secret payload");
    }

    #[test]
    fn envelope_contains_iv_and_ciphertext_separated_by_colon() {
        let enc = Encryptor::new("k");
        let stored = enc.encrypt(b"x").unwrap();
        let parts: Vec<&str> = stored.split(':').collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), 24); // 12 bytes hex-encoded
    }

    #[test]
    fn each_call_uses_a_fresh_iv() {
        let enc = Encryptor::new("k");
        let a = enc.encrypt(b"same plaintext").unwrap();
        let b = enc.encrypt(b"same plaintext").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn decrypt_rejects_malformed_input() {
        let enc = Encryptor::new("k");
        assert!(enc.decrypt("not-a-valid-envelope").is_err());
        assert!(enc.decrypt("deadbeef:deadbeef").is_err());
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let enc_a = Encryptor::new("key-a");
        let enc_b = Encryptor::new("key-b");
        let stored = enc_a.encrypt(b"payload").unwrap();
        assert!(enc_b.decrypt(&stored).is_err());
    }
}
