//! Error taxonomy for the transaction pipeline.

use thiserror::Error;

use crate::unspent::ScriptType;

pub type Result<T> = std::result::Result<T, WalletError>;

#[derive(Debug, Error)]
pub enum WalletError {
    /// Malformed key, address, hex or prepared-transaction input.
    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid destination {destination}: {reason}")]
    InvalidDestination { destination: String, reason: String },

    #[error("Output {index} of {amount} sats is below the dust threshold of {threshold} sats")]
    DustOutput {
        index: usize,
        amount: u64,
        threshold: u64,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown currency unit: {0}")]
    UnknownUnit(String),

    #[error("Transaction has no outputs and no message")]
    NoOutputs,

    #[error("Insufficient funds: need {required} sats, have {available} (short {shortfall})")]
    InsufficientFunds {
        available: u64,
        required: u64,
        shortfall: u64,
    },

    /// Internal invariant violation while assembling; never expected for
    /// inputs that passed selection.
    #[error("Assembly error: {0}")]
    Assembly(String),

    #[error("Input {input} needs {required} signatures, only {supplied} matching keys supplied")]
    InsufficientSignatures {
        input: usize,
        required: usize,
        supplied: usize,
    },

    #[error("Input {input} has unsupported script type {script_type:?}")]
    UnsupportedScript { input: usize, script_type: ScriptType },

    #[error("Input {input} cannot be signed with the supplied key: {reason}")]
    KeyMismatch { input: usize, reason: String },

    #[error("Expected {expected} input signers, got {supplied}")]
    SignerCount { expected: usize, supplied: usize },

    #[error("Secure random source failed: {0}")]
    Entropy(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Indexer or exchange-rate collaborator failure.
    #[error("Service error: {0}")]
    Service(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl WalletError {
    pub(crate) fn destination(destination: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDestination {
            destination: destination.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by caller input rather than key material or services.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidDestination { .. }
                | Self::DustOutput { .. }
                | Self::InvalidAmount(_)
                | Self::UnknownUnit(_)
                | Self::NoOutputs
        )
    }
}
