//! Key pairs
//!
//! A `KeyPair` owns a secp256k1 secret and its derived public key. The
//! compression flag and network are fixed at construction; the public key
//! bytes are computed once and addresses are cached on first use.
//!
//! Debug output shows the address only, never the secret.

use std::fmt;
use std::sync::OnceLock;

use bip32::{DerivationPath, XPrv};
use bip39::Mnemonic;
use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::{ecdsa::Signature, Message, PublicKey, SecretKey, SECP256K1};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::{self, hash160, sha256, EncryptedData};
use crate::error::{Result, WalletError};
use crate::network::NetworkParameters;
use crate::script::{encode_address, p2pkh_script, p2wpkh_program};

/// WIF payload suffix marking a compressed public key.
const COMPRESSED_FLAG: u8 = 0x01;

#[derive(Clone)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
    public_key_bytes: Vec<u8>,
    compressed: bool,
    params: NetworkParameters,
    address: OnceLock<String>,
    segwit_address: OnceLock<String>,
}

impl KeyPair {
    /// Fresh key from the operating system's secure random source.
    pub fn generate(params: NetworkParameters) -> Result<Self> {
        let mut bytes = Zeroizing::new([0u8; 32]);
        loop {
            OsRng
                .try_fill_bytes(&mut bytes[..])
                .map_err(|e| WalletError::Entropy(e.to_string()))?;
            // Zero or >= curve order is rejected; retry with new entropy
            if let Ok(secret) = SecretKey::from_slice(&bytes[..]) {
                return Ok(Self::from_secret(secret, true, params));
            }
        }
    }

    pub fn from_bytes(bytes: &[u8], compressed: bool, params: NetworkParameters) -> Result<Self> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|e| WalletError::Format(format!("Invalid private key: {}", e)))?;
        Ok(Self::from_secret(secret, compressed, params))
    }

    /// Decode a Base58Check WIF private key for the given network.
    ///
    /// Format: Base58Check( prefix || privkey_bytes [|| 0x01] )
    pub fn from_wif(wif: &str, params: NetworkParameters) -> Result<Self> {
        let decoded = Zeroizing::new(
            bs58::decode(wif.trim())
                .with_check(None)
                .into_vec()
                .map_err(|e| WalletError::Format(format!("Invalid WIF: {}", e)))?,
        );

        if decoded.is_empty() || decoded[0] != params.wif_prefix {
            return Err(WalletError::Format(format!(
                "Invalid WIF prefix (expected 0x{:02x} for {:?})",
                params.wif_prefix, params.network
            )));
        }

        let compressed = match decoded.len() {
            34 if decoded[33] == COMPRESSED_FLAG => true,
            33 => false,
            len => {
                return Err(WalletError::Format(format!(
                    "Invalid WIF length: expected 33 or 34 bytes, got {}",
                    len
                )))
            }
        };

        Self::from_bytes(&decoded[1..33], compressed, params)
    }

    /// Derive a compressed key from a BIP-39 mnemonic along a BIP-32 path
    /// such as `m/44'/0'/0'/0/0`.
    pub fn from_mnemonic(phrase: &str, path: &str, params: NetworkParameters) -> Result<Self> {
        let mnemonic: Mnemonic = phrase
            .trim()
            .parse()
            .map_err(|e| WalletError::Format(format!("Invalid mnemonic: {}", e)))?;
        let path: DerivationPath = path
            .parse()
            .map_err(|e| WalletError::Format(format!("Invalid derivation path {}: {}", path, e)))?;

        let mut seed = mnemonic.to_seed("");
        let derived = XPrv::derive_from_path(seed, &path)
            .map_err(|e| WalletError::Format(format!("Derivation failed: {}", e)));
        seed.zeroize();

        let mut privkey_bytes: [u8; 32] = derived?.to_bytes().into();
        let result = Self::from_bytes(&privkey_bytes, true, params);
        privkey_bytes.zeroize();
        result
    }

    /// Decrypt a key exported with [`KeyPair::export_encrypted`].
    pub fn import_encrypted(
        data: &EncryptedData,
        password: &str,
        params: NetworkParameters,
    ) -> Result<Self> {
        let plaintext = crypto::decrypt_secret(data, password)?;
        let wif = std::str::from_utf8(&plaintext)
            .map_err(|e| WalletError::Format(format!("Invalid UTF-8 in decrypted key: {}", e)))?;
        Self::from_wif(wif, params)
    }

    fn from_secret(secret: SecretKey, compressed: bool, params: NetworkParameters) -> Self {
        let public = PublicKey::from_secret_key(SECP256K1, &secret);
        let public_key_bytes = if compressed {
            public.serialize().to_vec()
        } else {
            public.serialize_uncompressed().to_vec()
        };
        Self {
            secret,
            public,
            public_key_bytes,
            compressed,
            params,
            address: OnceLock::new(),
            segwit_address: OnceLock::new(),
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    pub fn params(&self) -> &NetworkParameters {
        &self.params
    }

    /// 33 bytes when compressed, 65 otherwise.
    pub fn public_key_bytes(&self) -> &[u8] {
        &self.public_key_bytes
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(&self.public_key_bytes)
    }

    pub fn public_key_hash(&self) -> [u8; 20] {
        hash160(&self.public_key_bytes)
    }

    /// P2PKH locking script for this key.
    pub fn script_pubkey(&self) -> Vec<u8> {
        p2pkh_script(&self.public_key_hash())
    }

    /// Address = Base58Check( prefix || HASH160(public_key_bytes) )
    pub fn address(&self) -> &str {
        self.address
            .get_or_init(|| encode_address(self.params.pubkey_hash_prefix, &self.public_key_hash()))
    }

    /// P2SH-P2WPKH address; only defined for compressed keys.
    pub fn segwit_address(&self) -> Result<&str> {
        if !self.compressed {
            return Err(WalletError::Format(
                "Segwit addresses require a compressed public key".into(),
            ));
        }
        Ok(self.segwit_address.get_or_init(|| {
            let program = p2wpkh_program(&self.public_key_hash());
            encode_address(self.params.script_hash_prefix, &hash160(&program))
        }))
    }

    /// WIF encoding of the secret; the returned string is wiped on drop.
    pub fn to_wif(&self) -> Zeroizing<String> {
        let mut payload = Zeroizing::new(Vec::with_capacity(34));
        payload.push(self.params.wif_prefix);
        payload.extend_from_slice(&self.secret.secret_bytes());
        if self.compressed {
            payload.push(COMPRESSED_FLAG);
        }
        Zeroizing::new(bs58::encode(payload.as_slice()).with_check().into_string())
    }

    pub fn export_encrypted(&self, password: &str) -> Result<EncryptedData> {
        let wif = self.to_wif();
        crypto::encrypt_secret(wif.as_bytes(), password)
    }

    /// Deterministic (RFC 6979) low-S ECDSA over a 32-byte digest.
    pub fn sign_digest(&self, digest: [u8; 32]) -> Signature {
        let msg = Message::from_digest(digest);
        let mut sig = SECP256K1.sign_ecdsa(&msg, &self.secret);
        sig.normalize_s();
        sig
    }

    /// SHA256(data) → ECDSA sign → DER bytes.
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        self.sign_digest(sha256(data)).serialize_der().to_vec()
    }

    /// Verify a DER signature produced by [`KeyPair::sign`].
    pub fn verify(&self, data: &[u8], signature_der: &[u8]) -> bool {
        let Ok(sig) = Signature::from_der(signature_der) else {
            return false;
        };
        let msg = Message::from_digest(sha256(data));
        SECP256K1.verify_ecdsa(&msg, &sig, &self.public).is_ok()
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        self.secret.non_secure_erase();
    }
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.public_key_bytes == other.public_key_bytes && self.params == other.params
    }
}

impl Eq for KeyPair {}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address())
            .field("compressed", &self.compressed)
            .field("network", &self.params.network)
            .finish()
    }
}
