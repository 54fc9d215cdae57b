//! Transaction model, serialization and assembly
//!
//! `build` turns selected unspents and canonical outputs into an
//! `UnsignedTransaction`: it settles the fee, decides whether a change
//! output is worth creating, and fixes input and output order. The signer
//! later turns that skeleton into a `Transaction` with unlocking data.

use serde::{Deserialize, Serialize};

use crate::crypto::double_sha256;
use crate::error::{Result, WalletError};
use crate::fees::{Fee, SizeEstimator, SpendProfile};
use crate::network::{Network, NetworkParameters};
use crate::script::write_varint;
use crate::unspent::{total_amount, UnspentOutput};

pub const DEFAULT_VERSION: u32 = 1;
pub const DEFAULT_LOCKTIME: u32 = 0;
pub const DEFAULT_SEQUENCE: u32 = 0xffff_ffff;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub amount: u64,
    #[serde(with = "hex::serde")]
    pub script_pubkey: Vec<u8>,
}

impl TxOutput {
    pub fn new(amount: u64, script_pubkey: Vec<u8>) -> Self {
        Self {
            amount,
            script_pubkey,
        }
    }

    fn serialize_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.amount.to_le_bytes());
        write_varint(buf, self.script_pubkey.len() as u64);
        buf.extend_from_slice(&self.script_pubkey);
    }
}

/// Total value paid by a set of outputs; `None` on overflow.
pub fn total_output_amount(outputs: &[TxOutput]) -> Option<u64> {
    outputs
        .iter()
        .try_fold(0u64, |acc, o| acc.checked_add(o.amount))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    /// Internal byte order
    pub txid_bytes: [u8; 32],
    pub vout: u32,
    pub script_sig: Vec<u8>,
    pub witness: Vec<Vec<u8>>,
    pub sequence: u32,
}

impl TxInput {
    pub fn outpoint(&self) -> [u8; 36] {
        let mut out = [0u8; 36];
        out[..32].copy_from_slice(&self.txid_bytes);
        out[32..].copy_from_slice(&self.vout.to_le_bytes());
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub locktime: u32,
}

impl Transaction {
    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|i| !i.witness.is_empty())
    }

    /// Wire serialization; witness data is written only when requested and
    /// present.
    pub fn serialize(&self, include_witness: bool) -> Vec<u8> {
        let segwit = include_witness && self.has_witness();
        let mut buf = Vec::new();

        buf.extend_from_slice(&self.version.to_le_bytes());
        if segwit {
            buf.extend_from_slice(&[0x00, 0x01]);
        }

        write_varint(&mut buf, self.inputs.len() as u64);
        for inp in &self.inputs {
            buf.extend_from_slice(&inp.outpoint());
            write_varint(&mut buf, inp.script_sig.len() as u64);
            buf.extend_from_slice(&inp.script_sig);
            buf.extend_from_slice(&inp.sequence.to_le_bytes());
        }

        write_varint(&mut buf, self.outputs.len() as u64);
        buf.extend_from_slice(&self.serialize_outputs());

        if segwit {
            for inp in &self.inputs {
                write_varint(&mut buf, inp.witness.len() as u64);
                for item in &inp.witness {
                    write_varint(&mut buf, item.len() as u64);
                    buf.extend_from_slice(item);
                }
            }
        }

        buf.extend_from_slice(&self.locktime.to_le_bytes());
        buf
    }

    /// Concatenated outputs without the count prefix.
    pub fn serialize_outputs(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for out in &self.outputs {
            out.serialize_into(&mut buf);
        }
        buf
    }

    /// Double-SHA256 of the witness-stripped form, displayed reversed.
    pub fn txid(&self) -> String {
        let mut hash = double_sha256(&self.serialize(false));
        hash.reverse();
        hex::encode(hash)
    }

    /// ceil(weight / 4), where weight counts non-witness bytes four times.
    pub fn vsize(&self) -> u64 {
        let base = self.serialize(false).len() as u64;
        let total = self.serialize(true).len() as u64;
        (base * 3 + total).div_ceil(4)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize(true))
    }
}

/// Version, locktime and sequence used for new transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    pub version: u32,
    pub locktime: u32,
    pub sequence: u32,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION,
            locktime: DEFAULT_LOCKTIME,
            sequence: DEFAULT_SEQUENCE,
        }
    }
}

/// Fully decided transaction awaiting signatures.
///
/// This is also the offline-signing blob: it serializes to JSON with
/// everything a key holder needs to produce the final transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    pub network: Network,
    pub version: u32,
    pub locktime: u32,
    pub sequence: u32,
    pub inputs: Vec<UnspentOutput>,
    pub outputs: Vec<TxOutput>,
    pub fee: u64,
    /// Index into `outputs` of the change output, if one was created
    pub change_index: Option<usize>,
    /// Sat/vbyte the fee was sized for; absent for absolute fees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_rate: Option<u64>,
}

impl UnsignedTransaction {
    /// `None` when the amounts overflow, which only a corrupted blob can do.
    pub fn input_total(&self) -> Option<u64> {
        total_amount(&self.inputs)
    }

    pub fn output_total(&self) -> Option<u64> {
        total_output_amount(&self.outputs)
    }

    pub fn change(&self) -> u64 {
        self.change_index
            .and_then(|i| self.outputs.get(i))
            .map_or(0, |o| o.amount)
    }

    /// Transaction with every unlocking script empty.
    pub fn skeleton(&self) -> Result<Transaction> {
        let inputs = self
            .inputs
            .iter()
            .map(|u| {
                Ok(TxInput {
                    txid_bytes: u.txid_bytes()?,
                    vout: u.vout,
                    script_sig: Vec::new(),
                    witness: Vec::new(),
                    sequence: self.sequence,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Transaction {
            version: self.version,
            inputs,
            outputs: self.outputs.clone(),
            locktime: self.locktime,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| WalletError::Format(format!("Invalid prepared transaction: {}", e)))
    }
}

/// Assemble the unsigned transaction.
///
/// Outputs keep their order (user outputs, then message outputs); a change
/// output paying `leftover_script` is appended last when the leftover is not
/// dust. Sub-dust leftover is absorbed into the fee.
pub fn build(
    selected: Vec<UnspentOutput>,
    mut outputs: Vec<TxOutput>,
    leftover_script: &[u8],
    fee: Fee,
    profile: SpendProfile,
    params: &NetworkParameters,
    options: BuildOptions,
) -> Result<UnsignedTransaction> {
    if selected.is_empty() {
        return Err(WalletError::Assembly("No inputs selected".into()));
    }
    let input_total = total_amount(&selected)
        .ok_or_else(|| WalletError::Assembly("Input total overflows".into()))?;
    let output_total = total_output_amount(&outputs)
        .ok_or_else(|| WalletError::Assembly("Output total overflows".into()))?;

    let estimator = SizeEstimator::new(profile, &outputs, leftover_script.len());
    let fee_with_change = fee.for_size(estimator.vsize(&selected, true));

    let change = input_total
        .checked_sub(output_total)
        .and_then(|v| v.checked_sub(fee_with_change))
        .filter(|&change| !params.is_dust(change));

    let (fee_paid, change_index) = match change {
        Some(change) => {
            outputs.push(TxOutput::new(change, leftover_script.to_vec()));
            (fee_with_change, Some(outputs.len() - 1))
        }
        None => {
            let fee_without_change = fee.for_size(estimator.vsize(&selected, false));
            let leftover = input_total
                .checked_sub(output_total)
                .and_then(|v| v.checked_sub(fee_without_change))
                .ok_or_else(|| {
                    WalletError::Assembly(format!(
                        "Negative change: inputs {} < outputs {} + fee {}",
                        input_total, output_total, fee_without_change
                    ))
                })?;
            if leftover > 0 {
                log::debug!("Folding {} sats of sub-dust change into the fee", leftover);
            }
            (fee_without_change + leftover, None)
        }
    };

    log::debug!(
        "Assembled {} inputs / {} outputs, fee {} sats, change {:?}",
        selected.len(),
        outputs.len(),
        fee_paid,
        change_index.map(|i| outputs[i].amount)
    );

    Ok(UnsignedTransaction {
        network: params.network,
        version: options.version,
        locktime: options.locktime,
        sequence: options.sequence,
        inputs: selected,
        outputs,
        fee: fee_paid,
        change_index,
        fee_rate: match fee {
            Fee::PerByte(rate) => Some(rate),
            Fee::Absolute(_) => None,
        },
    })
}
