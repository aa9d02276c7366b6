use serde::{Deserialize, Serialize};

use crate::cipher::{FieldCipher, PiiError};

/// A PII attribute at rest: holds only the ciphertext token.
///
/// Conversions are explicit — [`EncryptedText::from_plaintext`] to store,
/// [`EncryptedText::reveal`] to read — so a call site cannot accidentally
/// persist plaintext. Serialization is transparent over the stored token;
/// the serde representation never contains plaintext.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedText(String);

impl EncryptedText {
    /// Encrypt a plaintext value for storage. Empty stays empty.
    pub fn from_plaintext(cipher: &FieldCipher, plaintext: &str) -> Result<Self, PiiError> {
        Ok(Self(cipher.encrypt(plaintext)?))
    }

    /// Wrap an already-stored token (e.g. loaded from the database).
    pub fn from_stored(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Materialize the plaintext transiently.
    ///
    /// Degrades to the stored token when the ciphertext is unreadable, per
    /// the codec's failure policy.
    pub fn reveal(&self, cipher: &FieldCipher) -> String {
        cipher.decrypt(&self.0)
    }

    /// The stored ciphertext token (safe to log lengths, persist, snapshot).
    pub fn as_stored(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Display for EncryptedText {
    /// Displays the stored token, never the plaintext.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
