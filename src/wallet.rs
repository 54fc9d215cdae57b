//! Wallet facade
//!
//! `TransactionBuilder` runs the key-less half of the pipeline (sanitize,
//! fund, select, assemble) and can hand the result off as JSON for signing
//! elsewhere. `Wallet` pairs a builder with one `KeyPair` and adds signing
//! and broadcast.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::error::{Result, WalletError};
use crate::fees::{Fee, FeeEstimator, FeeTarget, SpendProfile};
use crate::indexer::{unspents_for, ChainIndexer};
use crate::keys::KeyPair;
use crate::network::NetworkParameters;
use crate::sanitize::{Funding, OutputRequest, Sanitizer};
use crate::signer::{self, InputSigner, SignedTransaction};
use crate::transaction::{self, BuildOptions, UnsignedTransaction};
use crate::units::{satoshi_to, ExchangeRates, Unit};
use crate::unspent::{total_amount, UnspentOutput};

/// Per-call knobs for building a transaction.
#[derive(Debug, Clone)]
pub struct SendOptions {
    /// Overrides the fee estimator
    pub fee: Option<Fee>,
    pub fee_target: FeeTarget,
    /// Change address; defaults to the first funding address
    pub leftover: Option<String>,
    /// Spend every available unspent
    pub combine: bool,
    /// Embedded as null-data outputs
    pub message: Option<String>,
    /// Spend these instead of querying the indexer
    pub unspents: Option<Vec<UnspentOutput>>,
    pub build: BuildOptions,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            fee: None,
            fee_target: FeeTarget::default(),
            leftover: None,
            combine: true,
            message: None,
            unspents: None,
            build: BuildOptions::default(),
        }
    }
}

#[derive(Clone)]
pub struct TransactionBuilder {
    params: NetworkParameters,
    indexer: Arc<dyn ChainIndexer>,
    fees: Arc<FeeEstimator>,
    rates: Option<Arc<dyn ExchangeRates>>,
}

impl TransactionBuilder {
    pub fn new(
        params: NetworkParameters,
        indexer: Arc<dyn ChainIndexer>,
        fees: Arc<FeeEstimator>,
    ) -> Self {
        Self {
            params,
            indexer,
            fees,
            rates: None,
        }
    }

    pub fn with_rates(mut self, rates: Arc<dyn ExchangeRates>) -> Self {
        self.rates = Some(rates);
        self
    }

    pub fn params(&self) -> &NetworkParameters {
        &self.params
    }

    fn resolve_fee(&self, opts: &SendOptions) -> Fee {
        opts.fee
            .unwrap_or_else(|| Fee::PerByte(self.fees.get_fee(None, opts.fee_target)))
    }

    /// Build the unsigned transaction spending unspents of
    /// `funding_addresses` (or `opts.unspents`).
    pub fn prepare(
        &self,
        funding_addresses: &[&str],
        outputs: &[OutputRequest],
        profile: SpendProfile,
        opts: &SendOptions,
    ) -> Result<UnsignedTransaction> {
        let leftover = opts
            .leftover
            .as_deref()
            .or_else(|| funding_addresses.first().copied())
            .ok_or_else(|| WalletError::Format("No leftover address for change".into()))?;

        let sanitizer = Sanitizer::new(&self.params, profile, self.rates.as_deref());
        let message = opts.message.as_deref().map(str::as_bytes);
        let (selected, canonical, fee) =
            sanitizer.sanitize(outputs, leftover, message, opts.combine, || {
                let unspents = match &opts.unspents {
                    Some(unspents) => unspents.clone(),
                    None => unspents_for(&*self.indexer, funding_addresses)?,
                };
                Ok(Funding {
                    unspents,
                    fee: self.resolve_fee(opts),
                })
            })?;

        transaction::build(
            selected,
            canonical.outputs,
            &canonical.leftover_script,
            fee,
            profile,
            &self.params,
            opts.build,
        )
    }

    /// Unsigned transaction as a JSON blob for offline signing.
    pub fn prepare_transaction(
        &self,
        address: &str,
        outputs: &[OutputRequest],
        profile: SpendProfile,
        opts: &SendOptions,
    ) -> Result<String> {
        let unsigned = self.prepare(&[address], outputs, profile, opts)?;
        log::info!(
            "Prepared {} inputs / {} outputs from {} for offline signing",
            unsigned.inputs.len(),
            unsigned.outputs.len(),
            address
        );
        unsigned.to_json()
    }
}

/// Single-key wallet over a chain indexer.
pub struct Wallet {
    key: KeyPair,
    builder: TransactionBuilder,
}

impl Wallet {
    pub fn new(key: KeyPair, indexer: Arc<dyn ChainIndexer>, fees: Arc<FeeEstimator>) -> Self {
        let builder = TransactionBuilder::new(*key.params(), indexer, fees);
        Self { key, builder }
    }

    pub fn with_rates(mut self, rates: Arc<dyn ExchangeRates>) -> Self {
        self.builder = self.builder.with_rates(rates);
        self
    }

    pub fn key(&self) -> &KeyPair {
        &self.key
    }

    pub fn builder(&self) -> &TransactionBuilder {
        &self.builder
    }

    pub fn address(&self) -> &str {
        self.key.address()
    }

    /// Legacy address, then the wrapped-segwit address for compressed keys.
    pub fn addresses(&self) -> Vec<&str> {
        let mut addresses = vec![self.key.address()];
        if let Ok(segwit) = self.key.segwit_address() {
            addresses.push(segwit);
        }
        addresses
    }

    fn profile(&self) -> SpendProfile {
        SpendProfile::single(self.key.is_compressed())
    }

    pub fn get_unspents(&self) -> Result<Vec<UnspentOutput>> {
        unspents_for(&*self.builder.indexer, &self.addresses())
    }

    pub fn get_balance(&self) -> Result<u64> {
        total_amount(&self.get_unspents()?)
            .ok_or_else(|| WalletError::Service("Indexer reported a balance that overflows".into()))
    }

    pub fn balance_as(&self, unit: Unit) -> Result<Decimal> {
        satoshi_to(self.get_balance()?, unit, self.builder.rates.as_deref())
    }

    /// Txids touching any wallet address, first occurrence kept.
    pub fn get_transactions(&self) -> Result<Vec<String>> {
        let mut txids: Vec<String> = Vec::new();
        for address in self.addresses() {
            for txid in self.builder.indexer.get_transactions(address)? {
                if !txids.contains(&txid) {
                    txids.push(txid);
                }
            }
        }
        Ok(txids)
    }

    fn sign_unsigned(&self, unsigned: &UnsignedTransaction) -> Result<SignedTransaction> {
        let signed = signer::sign(unsigned, &[InputSigner::Single(&self.key)])?;
        log::info!(
            "Signed transaction {} ({} vbytes, fee {} sats)",
            signed.txid,
            signed.vsize,
            signed.fee
        );
        Ok(signed)
    }

    /// Build and sign without broadcasting.
    pub fn create_signed(
        &self,
        outputs: &[OutputRequest],
        opts: &SendOptions,
    ) -> Result<SignedTransaction> {
        let unsigned = self
            .builder
            .prepare(&self.addresses(), outputs, self.profile(), opts)?;
        self.sign_unsigned(&unsigned)
    }

    /// Signed transaction hex.
    pub fn create_transaction(&self, outputs: &[OutputRequest], opts: &SendOptions) -> Result<String> {
        Ok(self.create_signed(outputs, opts)?.hex)
    }

    /// Create, sign and broadcast; returns the txid reported by the indexer.
    pub fn send(&self, outputs: &[OutputRequest], opts: &SendOptions) -> Result<String> {
        let signed = self.create_signed(outputs, opts)?;
        let txid = self.builder.indexer.broadcast(&signed.hex)?;
        if txid != signed.txid {
            log::warn!("Indexer reported txid {} for transaction {}", txid, signed.txid);
        }
        log::info!("Broadcast transaction {}", txid);
        Ok(txid)
    }

    /// Unsigned JSON blob spending this wallet's unspents.
    pub fn prepare_transaction(&self, outputs: &[OutputRequest], opts: &SendOptions) -> Result<String> {
        self.builder
            .prepare(&self.addresses(), outputs, self.profile(), opts)?
            .to_json()
    }

    /// Sign a blob from `prepare_transaction`; returns the transaction hex.
    pub fn sign_transaction(&self, json: &str) -> Result<String> {
        let unsigned = UnsignedTransaction::from_json(json)?;
        if unsigned.network != self.key.params().network {
            return Err(WalletError::Format(format!(
                "Prepared transaction is for {:?}, key is for {:?}",
                unsigned.network,
                self.key.params().network
            )));
        }
        Ok(self.sign_unsigned(&unsigned)?.hex)
    }
}
