//! Single-signature UTXO transaction building
//!
//! Pipeline: sanitize outputs, fetch a fee rate, select unspents, assemble
//! the unsigned transaction, sign each input. [`Wallet`] drives the whole
//! thing for one key; [`TransactionBuilder`] stops before signing and emits
//! a JSON blob for offline signing.

pub mod crypto;
pub mod error;
pub mod fees;
pub mod indexer;
pub mod keys;
pub mod network;
pub mod sanitize;
pub mod script;
pub mod selection;
pub mod signer;
pub mod transaction;
pub mod units;
pub mod unspent;
pub mod wallet;

pub use error::{Result, WalletError};
pub use fees::{
    Fee, FeeConfig, FeeEstimator, FeeRateSource, FeeTarget, HttpFeeSource, MultisigShape, SpendProfile,
};
pub use indexer::ChainIndexer;
pub use keys::KeyPair;
pub use network::{Network, NetworkParameters};
pub use sanitize::OutputRequest;
pub use script::MultisigScript;
pub use signer::{InputSigner, SignedTransaction};
pub use transaction::{BuildOptions, Transaction, TxOutput, UnsignedTransaction};
pub use units::{ExchangeRates, Fiat, Unit};
pub use unspent::{ScriptType, UnspentOutput};
pub use wallet::{SendOptions, TransactionBuilder, Wallet};
