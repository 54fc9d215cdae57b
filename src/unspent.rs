//! Spendable outputs as reported by a chain indexer.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WalletError};

/// How an unspent output is locked, which decides how it is unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptType {
    #[serde(rename = "p2pkh")]
    P2pkh,
    /// P2SH over a bare multisig redeem script
    #[serde(rename = "p2sh")]
    P2sh,
    /// P2SH-wrapped P2WPKH
    #[serde(rename = "np2wkh")]
    NestedP2wpkh,
    /// P2SH-wrapped P2WSH multisig
    #[serde(rename = "np2wsh")]
    NestedP2wsh,
    #[serde(other, rename = "unknown")]
    Unknown,
}

impl ScriptType {
    pub fn is_segwit(&self) -> bool {
        matches!(self, ScriptType::NestedP2wpkh | ScriptType::NestedP2wsh)
    }

    pub fn is_multisig(&self) -> bool {
        matches!(self, ScriptType::P2sh | ScriptType::NestedP2wsh)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentOutput {
    /// Display-order (big-endian) transaction id hex
    pub txid: String,
    pub vout: u32,
    /// Value in satoshi
    pub amount: u64,
    /// Locking script hex
    #[serde(default)]
    pub script: String,
    pub script_type: ScriptType,
    #[serde(default)]
    pub confirmations: u32,
}

impl UnspentOutput {
    pub fn new(txid: impl Into<String>, vout: u32, amount: u64, script_type: ScriptType) -> Self {
        Self {
            txid: txid.into(),
            vout,
            amount,
            script: String::new(),
            script_type,
            confirmations: 0,
        }
    }

    pub fn with_script(mut self, script_hex: impl Into<String>) -> Self {
        self.script = script_hex.into();
        self
    }

    pub fn with_confirmations(mut self, confirmations: u32) -> Self {
        self.confirmations = confirmations;
        self
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmations > 0
    }

    /// Txid in internal (little-endian) byte order, as serialized in inputs.
    pub fn txid_bytes(&self) -> Result<[u8; 32]> {
        let mut bytes = hex::decode(&self.txid)
            .map_err(|e| WalletError::Format(format!("Invalid txid hex {}: {}", self.txid, e)))?;
        if bytes.len() != 32 {
            return Err(WalletError::Format(format!(
                "Invalid txid length: {}",
                bytes.len()
            )));
        }
        bytes.reverse();
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(out)
    }
}

/// Total value of a set of unspents; `None` on overflow.
pub fn total_amount(unspents: &[UnspentOutput]) -> Option<u64> {
    unspents
        .iter()
        .try_fold(0u64, |acc, u| acc.checked_add(u.amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_type_names_match_indexer_strings() {
        let json = r#"{"txid":"00","vout":1,"amount":5,"script_type":"np2wkh"}"#;
        let utxo: UnspentOutput = serde_json::from_str(json).unwrap();
        assert_eq!(utxo.script_type, ScriptType::NestedP2wpkh);
        assert!(utxo.script_type.is_segwit());
        assert!(!utxo.is_confirmed());
    }

    #[test]
    fn unrecognized_script_type_becomes_unknown() {
        let json = r#"{"txid":"00","vout":0,"amount":5,"script_type":"p2tr"}"#;
        let utxo: UnspentOutput = serde_json::from_str(json).unwrap();
        assert_eq!(utxo.script_type, ScriptType::Unknown);
    }

    #[test]
    fn txid_bytes_are_reversed() {
        let txid = format!("01{}", "00".repeat(31));
        let utxo = UnspentOutput::new(txid, 0, 1, ScriptType::P2pkh);
        let bytes = utxo.txid_bytes().unwrap();
        assert_eq!(bytes[31], 0x01);
        assert_eq!(bytes[0], 0x00);
    }

    #[test]
    fn bad_txid_is_format_error() {
        let utxo = UnspentOutput::new("abcd", 0, 1, ScriptType::P2pkh);
        assert!(matches!(utxo.txid_bytes(), Err(WalletError::Format(_))));
    }

    #[test]
    fn total_amount_detects_overflow() {
        let a = UnspentOutput::new("aa", 0, u64::MAX, ScriptType::P2pkh);
        let b = UnspentOutput::new("bb", 0, 1, ScriptType::P2pkh);
        assert_eq!(total_amount(&[a.clone()]), Some(u64::MAX));
        assert_eq!(total_amount(&[a, b]), None);
    }
}
