//! AES-256-GCM field codec.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum PiiError {
    #[error("encryption key must be {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("encryption key is not valid base64: {0}")]
    KeyDecode(#[from] base64::DecodeError),

    #[error("field encryption failed")]
    Encrypt,
}

/// Process-wide symmetric codec for PII fields.
///
/// The key is static configuration, never per-record. Tokens are
/// `base64url(nonce || ciphertext)` with a fresh random nonce per encryption,
/// so encrypting the same plaintext twice yields different tokens.
#[derive(Clone)]
pub struct FieldCipher {
    cipher: Aes256Gcm,
}

impl core::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Never print key material.
        f.write_str("FieldCipher")
    }
}

impl FieldCipher {
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.into()),
        }
    }

    /// Build from a base64url-encoded 32-byte key (the configuration format).
    pub fn from_base64(key_b64: &str) -> Result<Self, PiiError> {
        let bytes = BASE64.decode(key_b64.trim())?;
        let key: [u8; KEY_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| PiiError::InvalidKeyLength(bytes.len()))?;
        Ok(Self::new(&key))
    }

    /// Encrypt a plaintext field into a ciphertext token.
    ///
    /// Empty plaintext maps to itself: "field not set" stays distinguishable
    /// and cheap.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, PiiError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| PiiError::Encrypt)?;

        let mut envelope = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        envelope.extend_from_slice(&nonce);
        envelope.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(envelope))
    }

    /// Decrypt a stored token back to plaintext.
    ///
    /// On any decode or authentication failure the *stored value is returned
    /// unchanged*. This preserves the long-standing availability-over-
    /// strictness behavior of the system: unreadable ciphertext degrades to
    /// the raw column value instead of failing the read path. The degradation
    /// is logged so corruption stays observable.
    pub fn decrypt(&self, stored: &str) -> String {
        if stored.is_empty() {
            return String::new();
        }

        match self.try_decrypt(stored) {
            Some(plaintext) => plaintext,
            None => {
                tracing::warn!(token_len = stored.len(), "PII field decryption degraded; returning stored value");
                stored.to_string()
            }
        }
    }

    fn try_decrypt(&self, stored: &str) -> Option<String> {
        let envelope = BASE64.decode(stored).ok()?;
        if envelope.len() <= NONCE_LEN {
            return None;
        }
        let (nonce, ciphertext) = envelope.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .ok()?;
        String::from_utf8(plaintext).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_cipher() -> FieldCipher {
        FieldCipher::new(&[7u8; 32])
    }

    #[test]
    fn encrypt_then_decrypt_is_identity() {
        let cipher = test_cipher();
        let token = cipher.encrypt("Ada Lovelace").unwrap();
        assert_ne!(token, "Ada Lovelace");
        assert_eq!(cipher.decrypt(&token), "Ada Lovelace");
    }

    #[test]
    fn empty_plaintext_is_a_no_op() {
        let cipher = test_cipher();
        assert_eq!(cipher.encrypt("").unwrap(), "");
        assert_eq!(cipher.decrypt(""), "");
    }

    #[test]
    fn fresh_nonce_per_encryption() {
        let cipher = test_cipher();
        let a = cipher.encrypt("same input").unwrap();
        let b = cipher.encrypt("same input").unwrap();
        assert_ne!(a, b);
        assert_eq!(cipher.decrypt(&a), cipher.decrypt(&b));
    }

    #[test]
    fn tampered_ciphertext_returns_stored_value_unchanged() {
        let cipher = test_cipher();
        let token = cipher.encrypt("secret").unwrap();
        let mut bytes = BASE64.decode(&token).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let tampered = BASE64.encode(bytes);

        // Authenticated: never silently decrypts to wrong plaintext.
        assert_eq!(cipher.decrypt(&tampered), tampered);
    }

    #[test]
    fn garbage_token_returns_stored_value_unchanged() {
        let cipher = test_cipher();
        assert_eq!(cipher.decrypt("not base64 at all!"), "not base64 at all!");
        assert_eq!(cipher.decrypt("c2hvcnQ"), "c2hvcnQ");
    }

    #[test]
    fn wrong_key_returns_stored_value_unchanged() {
        let token = test_cipher().encrypt("secret").unwrap();
        let other = FieldCipher::new(&[9u8; 32]);
        assert_eq!(other.decrypt(&token), token);
    }

    #[test]
    fn key_from_base64_round_trips() {
        let key_b64 = BASE64.encode([3u8; 32]);
        let cipher = FieldCipher::from_base64(&key_b64).unwrap();
        let token = cipher.encrypt("hello").unwrap();
        assert_eq!(cipher.decrypt(&token), "hello");
    }

    #[test]
    fn key_with_wrong_length_is_rejected() {
        let short = BASE64.encode([1u8; 16]);
        match FieldCipher::from_base64(&short) {
            Err(PiiError::InvalidKeyLength(16)) => {}
            other => panic!("expected InvalidKeyLength, got {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn roundtrip_holds_for_arbitrary_strings(s in ".*") {
            let cipher = test_cipher();
            let token = cipher.encrypt(&s).unwrap();
            prop_assert_eq!(cipher.decrypt(&token), s);
        }
    }
}
