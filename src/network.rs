//! Network parameters
//!
//! Version bytes and relay policy for each supported chain. A value of
//! `NetworkParameters` is passed to every component that encodes or decodes
//! addresses, keys or dust-sensitive amounts.

use serde::{Deserialize, Serialize};

/// Default dust limit for P2PKH outputs (Bitcoin Core relay policy).
pub const DEFAULT_DUST_THRESHOLD: u64 = 546;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn params(self) -> NetworkParameters {
        match self {
            Network::Mainnet => NetworkParameters::MAINNET,
            Network::Testnet => NetworkParameters::TESTNET,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkParameters {
    pub network: Network,
    pub pubkey_hash_prefix: u8,
    pub script_hash_prefix: u8,
    pub wif_prefix: u8,
    pub dust_threshold: u64,
}

impl NetworkParameters {
    pub const MAINNET: NetworkParameters = NetworkParameters {
        network: Network::Mainnet,
        pubkey_hash_prefix: 0x00,
        script_hash_prefix: 0x05,
        wif_prefix: 0x80,
        dust_threshold: DEFAULT_DUST_THRESHOLD,
    };

    pub const TESTNET: NetworkParameters = NetworkParameters {
        network: Network::Testnet,
        pubkey_hash_prefix: 0x6f,
        script_hash_prefix: 0xc4,
        wif_prefix: 0xef,
        dust_threshold: DEFAULT_DUST_THRESHOLD,
    };

    pub fn with_dust_threshold(mut self, dust_threshold: u64) -> Self {
        self.dust_threshold = dust_threshold;
        self
    }

    pub fn is_dust(&self, amount: u64) -> bool {
        amount < self.dust_threshold
    }
}

impl Default for NetworkParameters {
    fn default() -> Self {
        Self::MAINNET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dust_boundary_is_inclusive_of_threshold() {
        let params = NetworkParameters::MAINNET;
        assert!(params.is_dust(545));
        assert!(!params.is_dust(546));
        assert!(params.with_dust_threshold(1000).is_dust(999));
    }

    #[test]
    fn network_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Network::Testnet).unwrap(), "\"testnet\"");
        assert_eq!(Network::Testnet.params().wif_prefix, 0xef);
    }
}
