//! Hashing helpers and password-based secret encryption
//!
//! The hash functions are the ones the transaction format is built on
//! (SHA-256, double SHA-256, HASH160). The encryption half wraps exported
//! secrets in a PBKDF2-HMAC-SHA256 + AES-256-GCM envelope.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{Result, WalletError};

/// Current envelope format version
const CURRENT_VERSION: u32 = 1;
/// OWASP 2024 minimum for PBKDF2-HMAC-SHA256
const PBKDF2_ITERATIONS: u32 = 100_000;
/// Highest stored iteration count accepted on decrypt
const MAX_PBKDF2_ITERATIONS: u32 = PBKDF2_ITERATIONS * 10;
const SALT_LENGTH: usize = 16;
/// 96-bit nonce for AES-GCM
const IV_LENGTH: usize = 12;
const KEY_LENGTH: usize = 32;

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// SHA-256 applied twice; transaction ids and sighashes use this.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// Hash160 = RIPEMD160(SHA256(data))
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    Ripemd160::digest(sha).into()
}

/// Encrypted secret envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedData {
    pub version: u32,
    pub ciphertext: String,
    pub iv: String,
    pub salt: String,
    pub iterations: u32,
}

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> Zeroizing<[u8; KEY_LENGTH]> {
    let mut key = Zeroizing::new([0u8; KEY_LENGTH]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key[..]);
    key
}

/// Encrypt `plaintext` under `password` with a fresh salt and nonce.
pub fn encrypt_secret(plaintext: &[u8], password: &str) -> Result<EncryptedData> {
    let mut salt = [0u8; SALT_LENGTH];
    let mut iv = [0u8; IV_LENGTH];
    let mut rng = rand::thread_rng();
    rng.fill_bytes(&mut salt);
    rng.fill_bytes(&mut iv);

    let key = derive_key(password, &salt, PBKDF2_ITERATIONS);
    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| WalletError::Encryption(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|e| WalletError::Encryption(format!("Encryption failed: {}", e)))?;

    Ok(EncryptedData {
        version: CURRENT_VERSION,
        ciphertext: BASE64.encode(&ciphertext),
        iv: BASE64.encode(iv),
        salt: BASE64.encode(salt),
        iterations: PBKDF2_ITERATIONS,
    })
}

/// Decrypt an envelope produced by [`encrypt_secret`].
pub fn decrypt_secret(data: &EncryptedData, password: &str) -> Result<Zeroizing<Vec<u8>>> {
    if data.version != CURRENT_VERSION {
        return Err(WalletError::Encryption(format!(
            "Unsupported envelope version {}",
            data.version
        )));
    }
    if data.iterations == 0 || data.iterations > MAX_PBKDF2_ITERATIONS {
        return Err(WalletError::Encryption(format!(
            "Iteration count {} outside 1..={}",
            data.iterations, MAX_PBKDF2_ITERATIONS
        )));
    }
    let decode = |field: &str, value: &str| {
        BASE64
            .decode(value)
            .map_err(|e| WalletError::Encryption(format!("Invalid {} base64: {}", field, e)))
    };
    let ciphertext = decode("ciphertext", &data.ciphertext)?;
    let iv = decode("iv", &data.iv)?;
    let salt = decode("salt", &data.salt)?;

    if iv.len() != IV_LENGTH {
        return Err(WalletError::Encryption(format!(
            "Invalid IV length: expected {}, got {}",
            IV_LENGTH,
            iv.len()
        )));
    }

    // Stored iteration count wins so older envelopes stay readable
    let key = derive_key(password, &salt, data.iterations);
    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| WalletError::Encryption(e.to_string()))?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&iv), ciphertext.as_ref())
        .map_err(|_| {
            WalletError::Encryption("Decryption failed - invalid password or corrupted data".into())
        })?;

    Ok(Zeroizing::new(plaintext))
}
