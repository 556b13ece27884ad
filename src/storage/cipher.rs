use std::fmt;

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes256;
use cbc::{Decryptor, Encryptor};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{AppError, Result};
use crate::storage::container::IV_LEN;

type Aes256CbcEnc = Encryptor<Aes256>;
type Aes256CbcDec = Decryptor<Aes256>;

/// AES block size in bytes
const BLOCK_SIZE: usize = 16;

/// Key length in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// AES-256-CBC engine bound to the server-wide static key.
///
/// Built once at startup and shared read-only. Every call to [`encrypt`]
/// draws a fresh IV from the OS random source.
///
/// [`encrypt`]: CipherEngine::encrypt
#[derive(Clone)]
pub struct CipherEngine {
    key: [u8; KEY_LEN],
}

impl fmt::Debug for CipherEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherEngine")
            .field("key", &"<redacted>")
            .finish()
    }
}

impl CipherEngine {
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// Build an engine from a 64 character hex key.
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let key_hex = key_hex.trim();
        if key_hex.len() != KEY_LEN * 2 {
            return Err(AppError::Crypto(format!(
                "encryption key must be {} hex characters, got {}",
                KEY_LEN * 2,
                key_hex.len()
            )));
        }

        let mut key = [0u8; KEY_LEN];
        hex::decode_to_slice(key_hex, &mut key)
            .map_err(|_| AppError::Crypto("encryption key is not valid hex".to_string()))?;
        Ok(Self::new(key))
    }

    /// Encrypt `plaintext` under a new random IV. Returns the ciphertext and the IV used.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<(Vec<u8>, [u8; IV_LEN])> {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        // PKCS#7 always adds between 1 and 16 bytes
        let mut buf = vec![0u8; plaintext.len() + BLOCK_SIZE];
        buf[..plaintext.len()].copy_from_slice(plaintext);

        let ciphertext_len = Aes256CbcEnc::new(&self.key.into(), &iv.into())
            .encrypt_padded_mut::<Pkcs7>(&mut buf, plaintext.len())
            .map_err(|_| AppError::Crypto("padding buffer too small".to_string()))?
            .len();
        buf.truncate(ciphertext_len);

        Ok((buf, iv))
    }

    /// Decrypt `ciphertext` produced under `iv`.
    pub fn decrypt(&self, ciphertext: &[u8], iv: &[u8; IV_LEN]) -> Result<Vec<u8>> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(AppError::Crypto(format!(
                "ciphertext length {} is not a positive multiple of the block size",
                ciphertext.len()
            )));
        }

        let mut buf = ciphertext.to_vec();
        let plaintext_len = Aes256CbcDec::new(&self.key.into(), &(*iv).into())
            .decrypt_padded_mut::<Pkcs7>(&mut buf)
            .map_err(|_| AppError::Crypto("invalid padding".to_string()))?
            .len();
        buf.truncate(plaintext_len);

        Ok(buf)
    }
}
