//! Script templates and address decoding
//!
//! Only the templates the wallet spends or pays to are built here:
//! P2PKH, P2SH (bare multisig or a wrapped witness program), the two v0
//! witness programs, and OP_RETURN null-data.

use crate::crypto::{hash160, sha256};
use crate::error::{Result, WalletError};
use crate::network::NetworkParameters;

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1: u8 = 0x51;
pub const OP_RETURN: u8 = 0x6a;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKMULTISIG: u8 = 0xae;

/// Encode a u64 as a Bitcoin varint.
pub fn write_varint(buf: &mut Vec<u8>, n: u64) {
    if n < 0xfd {
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(0xfd);
        buf.extend_from_slice(&(n as u16).to_le_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(0xfe);
        buf.extend_from_slice(&(n as u32).to_le_bytes());
    } else {
        buf.push(0xff);
        buf.extend_from_slice(&n.to_le_bytes());
    }
}

pub fn varint_len(n: u64) -> u64 {
    match n {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Append a minimal data push of `data` to `script`.
pub fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    if len < OP_PUSHDATA1 as usize {
        script.push(len as u8);
    } else if len <= 0xff {
        script.push(OP_PUSHDATA1);
        script.push(len as u8);
    } else if len <= 0xffff {
        script.push(OP_PUSHDATA2);
        script.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        script.push(OP_PUSHDATA4);
        script.extend_from_slice(&(len as u32).to_le_bytes());
    }
    script.extend_from_slice(data);
}

/// Byte length of the push opcode(s) [`push_data`] emits for `len` bytes.
pub fn push_prefix_len(len: usize) -> u64 {
    if len < OP_PUSHDATA1 as usize {
        1
    } else if len <= 0xff {
        2
    } else if len <= 0xffff {
        3
    } else {
        5
    }
}

/// OP_DUP OP_HASH160 <20-byte-hash> OP_EQUALVERIFY OP_CHECKSIG
pub fn p2pkh_script(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.push(OP_DUP);
    script.push(OP_HASH160);
    push_data(&mut script, pubkey_hash);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}

/// OP_HASH160 <20-byte-hash> OP_EQUAL
pub fn p2sh_script(script_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(23);
    script.push(OP_HASH160);
    push_data(&mut script, script_hash);
    script.push(OP_EQUAL);
    script
}

/// Version 0 witness program for a key hash: OP_0 <20 bytes>
pub fn p2wpkh_program(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(22);
    script.push(OP_0);
    push_data(&mut script, pubkey_hash);
    script
}

/// Version 0 witness program for a script: OP_0 <sha256(witness_script)>
pub fn p2wsh_program(witness_script: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(34);
    script.push(OP_0);
    push_data(&mut script, &sha256(witness_script));
    script
}

/// OP_RETURN <data>; the output carrying it is provably unspendable.
pub fn null_data_script(data: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(data.len() + 2);
    script.push(OP_RETURN);
    push_data(&mut script, data);
    script
}

/// Base58Check( version || hash )
pub fn encode_address(version: u8, hash: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(version);
    payload.extend_from_slice(hash);
    bs58::encode(payload).with_check().into_string()
}

/// A decoded payment destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    PubkeyHash([u8; 20]),
    /// Multisig or wrapped-segwit; the address alone cannot tell which.
    ScriptHash([u8; 20]),
}

impl Destination {
    pub fn from_address(address: &str, params: &NetworkParameters) -> Result<Self> {
        let decoded = bs58::decode(address.trim())
            .with_check(None)
            .into_vec()
            .map_err(|e| WalletError::destination(address, format!("invalid base58check: {}", e)))?;
        if decoded.len() != 21 {
            return Err(WalletError::destination(
                address,
                format!("invalid length: {}", decoded.len()),
            ));
        }
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&decoded[1..21]);

        match decoded[0] {
            v if v == params.pubkey_hash_prefix => Ok(Destination::PubkeyHash(hash)),
            v if v == params.script_hash_prefix => Ok(Destination::ScriptHash(hash)),
            v => Err(WalletError::destination(
                address,
                format!("unrecognized version byte 0x{:02x} for {:?}", v, params.network),
            )),
        }
    }

    pub fn script_pubkey(&self) -> Vec<u8> {
        match self {
            Destination::PubkeyHash(hash) => p2pkh_script(hash),
            Destination::ScriptHash(hash) => p2sh_script(hash),
        }
    }

    pub fn to_address(&self, params: &NetworkParameters) -> String {
        match self {
            Destination::PubkeyHash(hash) => encode_address(params.pubkey_hash_prefix, hash),
            Destination::ScriptHash(hash) => encode_address(params.script_hash_prefix, hash),
        }
    }
}

/// Decode an address straight to the locking script paying it.
pub fn script_for_address(address: &str, params: &NetworkParameters) -> Result<Vec<u8>> {
    Ok(Destination::from_address(address, params)?.script_pubkey())
}

/// An m-of-n CHECKMULTISIG redeem script.
///
/// Public keys keep the order they were supplied in; signatures must be
/// placed in that same order when spending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigScript {
    threshold: usize,
    public_keys: Vec<Vec<u8>>,
}

impl MultisigScript {
    pub fn new(threshold: usize, public_keys: Vec<Vec<u8>>) -> Result<Self> {
        if public_keys.is_empty() || public_keys.len() > 16 {
            return Err(WalletError::Format(format!(
                "Multisig needs 1 to 16 public keys, got {}",
                public_keys.len()
            )));
        }
        if threshold == 0 || threshold > public_keys.len() {
            return Err(WalletError::Format(format!(
                "Invalid multisig threshold {} of {}",
                threshold,
                public_keys.len()
            )));
        }
        if let Some(bad) = public_keys.iter().find(|k| k.len() != 33 && k.len() != 65) {
            return Err(WalletError::Format(format!(
                "Invalid public key length in multisig: {}",
                bad.len()
            )));
        }
        Ok(Self {
            threshold,
            public_keys,
        })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn public_keys(&self) -> &[Vec<u8>] {
        &self.public_keys
    }

    /// OP_m <pubkey>... OP_n OP_CHECKMULTISIG
    pub fn redeem_script(&self) -> Vec<u8> {
        let mut script = Vec::new();
        script.push(OP_1 + (self.threshold as u8 - 1));
        for key in &self.public_keys {
            push_data(&mut script, key);
        }
        script.push(OP_1 + (self.public_keys.len() as u8 - 1));
        script.push(OP_CHECKMULTISIG);
        script
    }

    /// Legacy P2SH address over the redeem script.
    pub fn address(&self, params: &NetworkParameters) -> String {
        encode_address(params.script_hash_prefix, &hash160(&self.redeem_script()))
    }

    /// P2SH-wrapped P2WSH address over the same script.
    pub fn segwit_address(&self, params: &NetworkParameters) -> String {
        let program = p2wsh_program(&self.redeem_script());
        encode_address(params.script_hash_prefix, &hash160(&program))
    }
}
