//! Chain-data service boundary
//!
//! Everything the core needs from the outside world: UTXO listing, fee-rate
//! recommendation, raw transaction lookup and broadcast. All four are
//! fallible network calls; failures come back as [`ChainError`] values.

#[cfg(feature = "mempool")]
pub mod mempool;

use async_trait::async_trait;
use bitcoin::Txid;
use serde::{Deserialize, Deserializer, Serialize};

#[cfg(feature = "mempool")]
pub use mempool::MempoolClient;

/// A spendable output as reported by the chain-data service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentOutput {
    pub txid: Txid,
    pub vout: u32,
    pub value: u64,
    pub confirmed: bool,
}

/// Snapshot of an address's outputs, split by confirmation status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoSet {
    pub confirmed: Vec<UnspentOutput>,
    pub unconfirmed: Vec<UnspentOutput>,
}

impl UtxoSet {
    pub fn from_outputs(outputs: impl IntoIterator<Item = UnspentOutput>) -> Self {
        let (confirmed, unconfirmed) = outputs.into_iter().partition(|u| u.confirmed);
        Self { confirmed, unconfirmed }
    }

    pub fn confirmed_balance(&self) -> u64 {
        self.confirmed.iter().map(|u| u.value).sum()
    }
}

/// Recommended fee rates in sat/vB. Only `fastest_fee` drives transaction building.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeRates {
    #[serde(deserialize_with = "sat_per_vb")]
    pub fastest_fee: u64,
    #[serde(default, deserialize_with = "sat_per_vb")]
    pub half_hour_fee: u64,
    #[serde(default, deserialize_with = "sat_per_vb")]
    pub hour_fee: u64,
    #[serde(default, deserialize_with = "sat_per_vb")]
    pub economy_fee: u64,
    #[serde(default, deserialize_with = "sat_per_vb")]
    pub minimum_fee: u64,
}

// Some backends report fractional rates; round up so we never underpay.
fn sat_per_vb<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let rate = f64::deserialize(deserializer)?;
    if !rate.is_finite() || rate < 0.0 {
        return Err(serde::de::Error::custom(format!("invalid fee rate {rate}")));
    }
    Ok(rate.ceil() as u64)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ChainData: Send + Sync {
    async fn list_utxos(&self, address: &str) -> Result<UtxoSet, ChainError>;
    async fn recommended_fees(&self) -> Result<FeeRates, ChainError>;
    async fn raw_transaction_hex(&self, txid: &Txid) -> Result<String, ChainError>;
    /// Submit a signed transaction; returns the txid the service reports.
    async fn broadcast(&self, raw_hex: &str) -> Result<Txid, ChainError>;
}
