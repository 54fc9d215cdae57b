//! Output sanitizer
//!
//! Turns caller output requests into canonical outputs: decoded locking
//! scripts and whole-satoshi amounts. All validation happens here, before
//! any unspent is fetched or selected.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WalletError};
use crate::fees::{Fee, SizeEstimator, SpendProfile};
use crate::network::NetworkParameters;
use crate::script::{null_data_script, script_for_address};
use crate::selection;
use crate::transaction::{total_output_amount, TxOutput};
use crate::units::{to_satoshi, ExchangeRates, Unit};
use crate::unspent::UnspentOutput;

/// Bytes of message carried by each null-data output.
pub const MESSAGE_CHUNK_LEN: usize = 40;

/// One requested payment, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRequest {
    pub destination: String,
    pub amount: Decimal,
    pub unit: Unit,
}

impl OutputRequest {
    pub fn new(destination: impl Into<String>, amount: Decimal, unit: Unit) -> Self {
        Self {
            destination: destination.into(),
            amount,
            unit,
        }
    }

    pub fn satoshi(destination: impl Into<String>, amount: u64) -> Self {
        Self::new(destination, Decimal::from(amount), Unit::Satoshi)
    }
}

/// Validated outputs ready for selection and assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalOutputs {
    /// User outputs in request order, then message outputs
    pub outputs: Vec<TxOutput>,
    /// Locking script receiving change
    #[serde(with = "hex::serde")]
    pub leftover_script: Vec<u8>,
}

impl CanonicalOutputs {
    /// Amount the selected inputs must cover before fees.
    pub fn target(&self) -> Result<u64> {
        total_output_amount(&self.outputs).ok_or_else(|| {
            WalletError::InvalidAmount("Requested outputs exceed the maximum amount".into())
        })
    }
}

pub struct Sanitizer<'a> {
    params: &'a NetworkParameters,
    profile: SpendProfile,
    rates: Option<&'a dyn ExchangeRates>,
}

impl<'a> Sanitizer<'a> {
    pub fn new(
        params: &'a NetworkParameters,
        profile: SpendProfile,
        rates: Option<&'a dyn ExchangeRates>,
    ) -> Self {
        Self {
            params,
            profile,
            rates,
        }
    }

    /// Validate requests and the leftover address, chunk the message.
    pub fn normalize(
        &self,
        requests: &[OutputRequest],
        leftover: &str,
        message: Option<&[u8]>,
    ) -> Result<CanonicalOutputs> {
        let message = message.filter(|m| !m.is_empty());
        if requests.is_empty() && message.is_none() {
            return Err(WalletError::NoOutputs);
        }

        let mut outputs = Vec::with_capacity(requests.len());
        for (index, request) in requests.iter().enumerate() {
            let script_pubkey = script_for_address(&request.destination, self.params)?;
            let amount = to_satoshi(request.amount, request.unit, self.rates)?;
            if self.params.is_dust(amount) {
                return Err(WalletError::DustOutput {
                    index,
                    amount,
                    threshold: self.params.dust_threshold,
                });
            }
            outputs.push(TxOutput::new(amount, script_pubkey));
        }

        if let Some(message) = message {
            outputs.extend(
                message
                    .chunks(MESSAGE_CHUNK_LEN)
                    .map(|chunk| TxOutput::new(0, null_data_script(chunk))),
            );
        }

        let leftover_script = script_for_address(leftover, self.params)?;

        let canonical = CanonicalOutputs {
            outputs,
            leftover_script,
        };
        canonical.target()?;
        Ok(canonical)
    }

    /// Validate outputs, then fund and select inputs.
    ///
    /// `funding` runs only after every output has passed validation.
    pub fn sanitize<F>(
        &self,
        requests: &[OutputRequest],
        leftover: &str,
        message: Option<&[u8]>,
        combine: bool,
        funding: F,
    ) -> Result<(Vec<UnspentOutput>, CanonicalOutputs, Fee)>
    where
        F: FnOnce() -> Result<Funding>,
    {
        let canonical = self.normalize(requests, leftover, message)?;
        let target = canonical.target()?;
        let Funding { unspents, fee } = funding()?;
        let estimator = SizeEstimator::new(
            self.profile,
            &canonical.outputs,
            canonical.leftover_script.len(),
        );
        let selected =
            selection::select(&unspents, target, fee, combine, &estimator)?;
        Ok((selected, canonical, fee))
    }
}

/// Candidate inputs and the fee policy to spend them under.
#[derive(Debug, Clone)]
pub struct Funding {
    pub unspents: Vec<UnspentOutput>,
    pub fee: Fee,
}
