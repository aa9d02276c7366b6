//! `verihire-pii` — reversible authenticated encryption of PII attributes.
//!
//! Employee names, external ids, emails and phone numbers are stored only in
//! encrypted form; plaintext is materialized transiently for serialization and
//! processing. The codec is AES-256-GCM under a single process-wide key.
//!
//! Call sites never touch ciphertext/plaintext conversion directly: the
//! [`EncryptedText`] value type requires explicit `from_plaintext`/`reveal`
//! calls, so accidental plaintext persistence does not typecheck.

pub mod cipher;
pub mod encrypted;

pub use cipher::{FieldCipher, PiiError};
pub use encrypted::EncryptedText;
