//! Chain indexer collaborator
//!
//! The pipeline reads unspents and history through this trait and hands
//! finished transactions to it for relay. Errors are returned as
//! `WalletError::Service` and always propagate: a transaction is never built
//! from a guessed unspent set.

use crate::error::Result;
use crate::unspent::UnspentOutput;

pub trait ChainIndexer: Send + Sync {
    fn get_unspent(&self, address: &str) -> Result<Vec<UnspentOutput>>;

    /// Display-order txids touching `address`.
    fn get_transactions(&self, address: &str) -> Result<Vec<String>>;

    /// Relay a serialized transaction; returns its txid.
    fn broadcast(&self, tx_hex: &str) -> Result<String>;
}

/// Unspents for every address, in address order.
pub fn unspents_for(indexer: &dyn ChainIndexer, addresses: &[&str]) -> Result<Vec<UnspentOutput>> {
    let mut all = Vec::new();
    for address in addresses {
        let found = indexer.get_unspent(address)?;
        log::debug!("Indexer returned {} unspents for {}", found.len(), address);
        all.extend(found);
    }
    Ok(all)
}
