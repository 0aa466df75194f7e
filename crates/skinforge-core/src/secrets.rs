//! Symmetric codec for stored account credentials.
//!
//! Account passwords and security answers are persisted encrypted with
//! XChaCha20-Poly1305 under a process-wide key from configuration. The
//! stored form is base64 of `nonce (24 B) || ciphertext || tag (16 B)`, so
//! each encryption of the same plaintext produces a distinct string.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};

/// Key size in bytes (256-bit key).
pub const KEY_SIZE: usize = 32;

/// Nonce size in bytes.
pub const NONCE_SIZE: usize = 24;

/// Errors from the credential codec.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    /// The stored string is not valid base64.
    #[error("stored credential is not valid base64")]
    Encoding,

    /// The stored blob is too short to contain a nonce.
    #[error("stored credential is truncated")]
    Truncated,

    /// AEAD encryption failed.
    #[error("credential encryption failed")]
    Encryption,

    /// AEAD decryption or UTF-8 recovery failed (wrong key or corrupt data).
    #[error("credential decryption failed")]
    Decryption,
}

/// Encrypts and decrypts persisted credential strings.
///
/// Cheap to clone; holds only the cipher state derived from the 32-byte key.
#[derive(Clone)]
pub struct SecretCodec {
    cipher: XChaCha20Poly1305,
}

impl SecretCodec {
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self {
            cipher: XChaCha20Poly1305::new(&key.into()),
        }
    }

    /// Encrypt a plaintext credential into its stored form.
    pub fn encrypt(&self, plain: &str) -> Result<String, SecretError> {
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plain.as_bytes())
            .map_err(|_| SecretError::Encryption)?;

        let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        blob.extend_from_slice(nonce.as_slice());
        blob.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(blob))
    }

    /// Decrypt a stored credential back to its plaintext.
    pub fn decrypt(&self, stored: &str) -> Result<String, SecretError> {
        let blob = BASE64.decode(stored).map_err(|_| SecretError::Encoding)?;
        if blob.len() <= NONCE_SIZE {
            return Err(SecretError::Truncated);
        }

        let (nonce, ciphertext) = blob.split_at(NONCE_SIZE);
        let plain = self
            .cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| SecretError::Decryption)?;
        String::from_utf8(plain).map_err(|_| SecretError::Decryption)
    }
}
