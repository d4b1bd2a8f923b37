//! Cryptographic utilities.

use crate::error::{Result, SecurityError};
use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use async_trait::async_trait;
use base64::Engine as _;
use gateway_core::{CipherContext, Decryptor, Encryptor, StoreResult};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

const NONCE_LEN: usize = 12;

/// Hashing helpers.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashingService;

impl HashingService {
    /// SHA-256 as lowercase hex.
    #[must_use]
    pub fn sha256_hex(data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    /// Lookup hash for a raw caller secret.
    #[must_use]
    pub fn hash_key(raw: &str) -> String {
        Self::sha256_hex(raw.as_bytes())
    }
}

/// AES-256-GCM cipher for provider secrets at rest.
///
/// The cipher context (the setting's `X-UPDATED-AT` tag) is bound as
/// associated data, so a ciphertext only decrypts under the timestamp it was
/// written with. Output is base64 of `nonce || ciphertext`.
#[derive(Clone, Default)]
pub struct SecretCipher {
    key: Option<Zeroizing<[u8; 32]>>,
}

impl SecretCipher {
    /// Create a cipher with the given key.
    ///
    /// # Errors
    /// Returns error if key is not 32 bytes.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != 32 {
            return Err(SecurityError::Encryption(
                "Key must be 32 bytes".to_string(),
            ));
        }

        let mut key_array = Zeroizing::new([0u8; 32]);
        key_array.copy_from_slice(key);

        Ok(Self {
            key: Some(key_array),
        })
    }

    /// Create from a hex-encoded key.
    ///
    /// # Errors
    /// Returns error if key is invalid.
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let key = Zeroizing::new(
            hex::decode(hex_key)
                .map_err(|e| SecurityError::Encryption(format!("Invalid hex key: {e}")))?,
        );
        Self::new(&key)
    }

    /// Create from a base64-encoded key.
    ///
    /// # Errors
    /// Returns error if key is invalid.
    pub fn from_base64(b64_key: &str) -> Result<Self> {
        let key = Zeroizing::new(
            base64::engine::general_purpose::STANDARD
                .decode(b64_key)
                .map_err(|e| SecurityError::Encryption(format!("Invalid base64 key: {e}")))?,
        );
        Self::new(&key)
    }

    /// A cipher that reports itself disabled.
    #[must_use]
    pub fn disabled() -> Self {
        Self { key: None }
    }

    /// Generate a new random key.
    #[must_use]
    pub fn generate_key() -> [u8; 32] {
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        key
    }

    /// Whether a key is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| SecurityError::config("encryption key is not configured"))?;
        Aes256Gcm::new_from_slice(&key[..])
            .map_err(|e| SecurityError::Encryption(format!("Failed to create cipher: {e}")))
    }

    fn associated_data(context: &CipherContext) -> Vec<u8> {
        context
            .iter()
            .flat_map(|(k, v)| [k.as_bytes(), b"=", v.as_bytes(), b"\n"])
            .flatten()
            .copied()
            .collect()
    }

    /// Encrypt a string under `context`, returning base64.
    ///
    /// # Errors
    /// Returns error if no key is configured or encryption fails.
    pub fn encrypt_string(&self, plaintext: &str, context: &CipherContext) -> Result<String> {
        let cipher = self.cipher()?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let aad = Self::associated_data(context);
        let ciphertext = cipher
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: &aad,
                },
            )
            .map_err(|e| SecurityError::Encryption(format!("Encryption failed: {e}")))?;

        let mut result = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend(ciphertext);

        Ok(base64::engine::general_purpose::STANDARD.encode(result))
    }

    /// Decrypt a base64 string under `context`.
    ///
    /// # Errors
    /// Returns error if no key is configured, the input is malformed, or the
    /// context does not match the one used to encrypt.
    pub fn decrypt_string(&self, ciphertext: &str, context: &CipherContext) -> Result<String> {
        let data = base64::engine::general_purpose::STANDARD
            .decode(ciphertext)
            .map_err(|e| SecurityError::Decryption(format!("Invalid base64: {e}")))?;
        if data.len() < NONCE_LEN {
            return Err(SecurityError::Decryption(
                "Ciphertext too short".to_string(),
            ));
        }

        let cipher = self.cipher()?;
        let (nonce, body) = data.split_at(NONCE_LEN);
        let aad = Self::associated_data(context);
        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: body,
                    aad: &aad,
                },
            )
            .map_err(|e| SecurityError::Decryption(format!("Decryption failed: {e}")))?;

        String::from_utf8(plaintext)
            .map_err(|e| SecurityError::Decryption(format!("Invalid UTF-8: {e}")))
    }
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher")
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[async_trait]
impl Decryptor for SecretCipher {
    fn enabled(&self) -> bool {
        self.is_enabled()
    }

    async fn decrypt(&self, ciphertext: &str, context: &CipherContext) -> StoreResult<String> {
        Ok(self.decrypt_string(ciphertext, context)?)
    }
}

#[async_trait]
impl Encryptor for SecretCipher {
    fn enabled(&self) -> bool {
        self.is_enabled()
    }

    async fn encrypt(&self, plaintext: &str, context: &CipherContext) -> StoreResult<String> {
        Ok(self.encrypt_string(plaintext, context)?)
    }
}
