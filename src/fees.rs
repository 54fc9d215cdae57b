//! Fees and transaction size
//!
//! Two concerns live here. Size estimation predicts the virtual size of a
//! transaction before it is signed, using worst-case signature lengths so
//! the estimate never undershoots. The `FeeEstimator` supplies a
//! satoshi-per-vbyte rate from a caller override, a cached external
//! source, or a conservative default when the source is unreachable.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WalletError};
use crate::script::{push_prefix_len, varint_len, MultisigScript};
use crate::transaction::TxOutput;
use crate::unspent::{ScriptType, UnspentOutput};

/// Upper bound of a low-S DER signature plus its sighash byte.
pub const MAX_SIGNATURE_LEN: u64 = 72;

const OUTPOINT_LEN: u64 = 36;
const SEQUENCE_LEN: u64 = 4;
/// version + locktime
const TX_FIXED_LEN: u64 = 8;
/// segwit marker + flag, counted in witness bytes
const SEGWIT_HEADER_LEN: u64 = 2;

pub const DEFAULT_FEE_URL: &str = "https://mempool.space/api/v1/fees/recommended";

/// How the fee of a transaction is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fee {
    /// Satoshi per virtual byte
    PerByte(u64),
    /// Fixed total regardless of size
    Absolute(u64),
}

impl Fee {
    pub fn for_size(&self, vsize: u64) -> u64 {
        match *self {
            Fee::PerByte(rate) => vsize.saturating_mul(rate),
            Fee::Absolute(total) => total,
        }
    }
}

/// Byte cost of one input: non-witness bytes and witness bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSize {
    pub base: u64,
    pub witness: u64,
}

/// The key material behind the inputs being spent, which fixes how large
/// their unlocking data will be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendProfile {
    pub compressed: bool,
    /// Set when spending multisig outputs
    pub multisig: Option<MultisigShape>,
}

/// What a multisig unlock costs: signatures pushed and redeem script bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigShape {
    pub threshold: usize,
    pub redeem_len: u64,
}

impl SpendProfile {
    pub fn single(compressed: bool) -> Self {
        Self {
            compressed,
            multisig: None,
        }
    }

    /// `threshold`-of-`total` over compressed keys.
    pub fn multisig(threshold: usize, total: usize) -> Self {
        Self {
            compressed: true,
            multisig: Some(MultisigShape {
                threshold,
                redeem_len: 3 + total as u64 * 34,
            }),
        }
    }

    /// Profile sized from the actual redeem script, so uncompressed or
    /// mixed keys are counted at their real length.
    pub fn for_multisig(script: &MultisigScript) -> Self {
        Self {
            compressed: script.public_keys().iter().all(|pk| pk.len() == 33),
            multisig: Some(MultisigShape {
                threshold: script.threshold(),
                redeem_len: script.redeem_script().len() as u64,
            }),
        }
    }

    fn pubkey_len(&self) -> u64 {
        if self.compressed {
            33
        } else {
            65
        }
    }

    fn shape(&self) -> MultisigShape {
        self.multisig.unwrap_or(MultisigShape {
            threshold: 1,
            redeem_len: 3 + 1 + self.pubkey_len(),
        })
    }

    fn multisig_signatures_len(&self) -> u64 {
        self.shape().threshold as u64 * (1 + MAX_SIGNATURE_LEN)
    }

    pub fn input_size(&self, script_type: ScriptType) -> InputSize {
        let with_script_sig = |script_sig: u64| InputSize {
            base: OUTPOINT_LEN + varint_len(script_sig) + script_sig + SEQUENCE_LEN,
            witness: 0,
        };
        match script_type {
            ScriptType::P2pkh | ScriptType::Unknown => {
                with_script_sig(1 + MAX_SIGNATURE_LEN + 1 + self.pubkey_len())
            }
            ScriptType::P2sh => {
                let redeem = self.shape().redeem_len;
                with_script_sig(
                    1 + self.multisig_signatures_len() + push_prefix_len(redeem as usize) + redeem,
                )
            }
            ScriptType::NestedP2wpkh => InputSize {
                // scriptSig pushes the 22-byte witness program
                base: OUTPOINT_LEN + 1 + 23 + SEQUENCE_LEN,
                witness: 1 + 1 + MAX_SIGNATURE_LEN + 1 + 33,
            },
            ScriptType::NestedP2wsh => {
                let MultisigShape {
                    threshold: m,
                    redeem_len: redeem,
                } = self.shape();
                InputSize {
                    // scriptSig pushes the 34-byte witness program
                    base: OUTPOINT_LEN + 1 + 35 + SEQUENCE_LEN,
                    witness: varint_len(m as u64 + 2)
                        + 1
                        + self.multisig_signatures_len()
                        + varint_len(redeem)
                        + redeem,
                }
            }
        }
    }
}

/// Virtual size of a transaction with the given inputs and output scripts.
pub fn estimate_vsize(inputs: &[InputSize], output_script_lens: &[usize]) -> u64 {
    let outputs: u64 = output_script_lens
        .iter()
        .map(|&len| 8 + varint_len(len as u64) + len as u64)
        .sum();
    let base = TX_FIXED_LEN
        + varint_len(inputs.len() as u64)
        + inputs.iter().map(|i| i.base).sum::<u64>()
        + varint_len(output_script_lens.len() as u64)
        + outputs;

    if inputs.iter().all(|i| i.witness == 0) {
        return base;
    }
    // Inputs without witness data still serialize an empty stack (one byte)
    let witness = SEGWIT_HEADER_LEN
        + inputs
            .iter()
            .map(|i| if i.witness == 0 { 1 } else { i.witness })
            .sum::<u64>();
    base + witness.div_ceil(4)
}

/// Size model for one transaction being built: fixed outputs, an optional
/// change output, and a variable input set.
#[derive(Debug, Clone)]
pub struct SizeEstimator {
    profile: SpendProfile,
    output_script_lens: Vec<usize>,
    change_script_len: usize,
}

impl SizeEstimator {
    pub fn new(profile: SpendProfile, outputs: &[TxOutput], change_script_len: usize) -> Self {
        Self {
            profile,
            output_script_lens: outputs.iter().map(|o| o.script_pubkey.len()).collect(),
            change_script_len,
        }
    }

    pub fn vsize<'a>(
        &self,
        inputs: impl IntoIterator<Item = &'a UnspentOutput>,
        with_change: bool,
    ) -> u64 {
        let inputs: Vec<InputSize> = inputs
            .into_iter()
            .map(|u| self.profile.input_size(u.script_type))
            .collect();
        if with_change {
            let mut lens = self.output_script_lens.clone();
            lens.push(self.change_script_len);
            estimate_vsize(&inputs, &lens)
        } else {
            estimate_vsize(&inputs, &self.output_script_lens)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeTarget {
    /// Next-block confirmation
    #[default]
    Fast,
    /// Confirmation within about an hour
    Hour,
}

/// External fee-rate service.
pub trait FeeRateSource: Send + Sync {
    fn current_rate(&self, target: FeeTarget) -> Result<u64>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    pub cache_ttl_secs: u64,
    pub default_fast: u64,
    pub default_hour: u64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 600,
            default_fast: 150,
            default_hour: 60,
        }
    }
}

impl FeeConfig {
    pub fn default_rate(&self, target: FeeTarget) -> u64 {
        match target {
            FeeTarget::Fast => self.default_fast,
            FeeTarget::Hour => self.default_hour,
        }
    }
}

struct CachedRate {
    rate: u64,
    fetched_at: Instant,
}

/// Process-wide fee-rate provider.
///
/// The cache lock is held across the external call, so concurrent callers
/// wait for one fetch and reuse its result.
pub struct FeeEstimator {
    source: Option<Box<dyn FeeRateSource>>,
    config: FeeConfig,
    cache: Mutex<HashMap<FeeTarget, CachedRate>>,
}

impl FeeEstimator {
    pub fn new(source: impl FeeRateSource + 'static, config: FeeConfig) -> Self {
        Self {
            source: Some(Box::new(source)),
            config,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Estimator without an external source; always answers the defaults.
    pub fn offline(config: FeeConfig) -> Self {
        Self {
            source: None,
            config,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &FeeConfig {
        &self.config
    }

    /// Satoshi per vbyte: `explicit` if given, otherwise the cached or
    /// freshly fetched rate, otherwise the configured default.
    pub fn get_fee(&self, explicit: Option<u64>, target: FeeTarget) -> u64 {
        if let Some(rate) = explicit {
            return rate;
        }
        let Some(source) = &self.source else {
            return self.config.default_rate(target);
        };

        let ttl = Duration::from_secs(self.config.cache_ttl_secs);
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = cache.get(&target) {
            if cached.fetched_at.elapsed() < ttl {
                return cached.rate;
            }
        }

        match source.current_rate(target) {
            Ok(rate) => {
                log::debug!("Fetched {:?} fee rate: {} sat/vB", target, rate);
                cache.insert(
                    target,
                    CachedRate {
                        rate,
                        fetched_at: Instant::now(),
                    },
                );
                rate
            }
            Err(e) => {
                let fallback = self.config.default_rate(target);
                log::warn!("Fee rate service unavailable ({}), using default {} sat/vB", e, fallback);
                fallback
            }
        }
    }
}

/// Recommended-fees JSON as served by mempool-style explorers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedFees {
    pub fastest_fee: u64,
    pub half_hour_fee: u64,
    pub hour_fee: u64,
}

impl RecommendedFees {
    pub fn rate_for(&self, target: FeeTarget) -> u64 {
        match target {
            FeeTarget::Fast => self.fastest_fee,
            FeeTarget::Hour => self.hour_fee,
        }
    }
}

/// Blocking HTTP fee-rate source.
pub struct HttpFeeSource {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpFeeSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| WalletError::Service(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Source pointed at [`DEFAULT_FEE_URL`].
    pub fn recommended() -> Result<Self> {
        Self::new(DEFAULT_FEE_URL)
    }
}

impl FeeRateSource for HttpFeeSource {
    fn current_rate(&self, target: FeeTarget) -> Result<u64> {
        let fees: RecommendedFees = self
            .client
            .get(&self.url)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| WalletError::Service(format!("Fee request to {} failed: {}", self.url, e)))?;
        Ok(fees.rate_for(target))
    }
}
