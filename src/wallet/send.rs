//! End-to-end transfer: validate, select, assemble, sign, broadcast.

use bitcoin::consensus::encode::serialize_hex;
use bitcoin::{Address, Transaction, Txid};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::assemble::{assemble_psbt, fetch_funding_transactions};
use super::select::{select_coins, TransactionPlan};
use super::sign::sign_psbt;
use crate::address::{parse_address, AddressType};
use crate::chain::ChainData;
use crate::config::FractalConfig;
use crate::error::{Error, Result};
use crate::keys::KeyMaterial;

/// Source of funds: an address and the WIF controlling it.
#[derive(Clone)]
pub struct AddressPair {
    pub address: String,
    pub wif: String,
}

impl AddressPair {
    pub fn new(address: impl Into<String>, wif: impl Into<String>) -> Self {
        Self { address: address.into(), wif: wif.into() }
    }
}

impl std::fmt::Debug for AddressPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressPair").field("address", &self.address).finish_non_exhaustive()
    }
}

/// A fully signed transaction that has not been broadcast yet.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub tx: Transaction,
    pub plan: TransactionPlan,
    pub source_type: AddressType,
}

impl SignedTransaction {
    pub fn txid(&self) -> Txid { self.tx.compute_txid() }
    pub fn raw_hex(&self) -> String { serialize_hex(&self.tx) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendReceipt {
    pub txid: Txid,
    pub amount: u64,
    pub fee: u64,
    pub fee_rate: u64,
    pub inputs: usize,
    pub change: Option<u64>,
}

/// Validated source: parsed address, its family, and the key that spends it.
#[derive(Debug)]
struct Source {
    ty: AddressType,
    address: Address,
    key: KeyMaterial,
}

fn validate_source(from: &AddressPair, config: &FractalConfig) -> Result<Source> {
    let (ty, address) = parse_address(&from.address, config.network, "fromAddress")?;
    let key = KeyMaterial::from_wif(&from.wif)?;
    if key.address(ty, config.network) != address {
        return Err(Error::KeyMismatch { address: from.address.clone() });
    }
    Ok(Source { ty, address, key })
}

/// Confirmed balance of `address`.
pub async fn confirmed_balance<C: ChainData + ?Sized>(chain: &C, config: &FractalConfig, address: &str) -> Result<u64> {
    parse_address(address, config.network, "address")?;
    Ok(chain.list_utxos(address).await?.confirmed_balance())
}

/// Build and sign a transfer of `amount` sats without broadcasting it.
pub async fn build_transfer<C: ChainData + ?Sized>(
    chain: &C,
    config: &FractalConfig,
    from: &AddressPair,
    to: &str,
    amount: u64,
) -> Result<SignedTransaction> {
    let source = validate_source(from, config)?;
    let (to_type, to_address) = parse_address(to, config.network, "toAddress")?;

    let utxos = chain.list_utxos(&from.address).await?;
    let balance = utxos.confirmed_balance();
    if amount >= balance {
        return Err(Error::InsufficientBalance { balance, amount });
    }

    let fee_rate = chain.recommended_fees().await?.fastest_fee;
    debug!(fee_rate, confirmed = utxos.confirmed.len(), balance, "fee rate and funds");

    let plan = select_coins(&utxos.confirmed, amount, &to_address, to_type, &source.address, fee_rate)?;
    debug!(inputs = plan.inputs.len(), fee = plan.fee(), change = ?plan.change(), "coins selected");

    let funding = fetch_funding_transactions(chain, &plan.inputs).await?;
    let psbt = assemble_psbt(&plan, &funding, source.ty, &source.key)?;
    let tx = sign_psbt(psbt, source.ty, &source.key)?;

    Ok(SignedTransaction { tx, plan, source_type: source.ty })
}

/// Submit a signed transaction and return the txid the service reports.
pub async fn broadcast_transaction<C: ChainData + ?Sized>(chain: &C, signed: &SignedTransaction) -> Result<Txid> {
    let txid = chain.broadcast(&signed.raw_hex()).await.map_err(|e| Error::BroadcastRejected(e.to_string()))?;
    if txid != signed.txid() {
        warn!(reported = %txid, computed = %signed.txid(), "service reported a different txid");
    }
    Ok(txid)
}

/// Send `amount` sats from `from` to `to`, paying the service's fastest fee rate.
pub async fn send<C: ChainData + ?Sized>(
    chain: &C,
    config: &FractalConfig,
    from: &AddressPair,
    to: &str,
    amount: u64,
) -> Result<SendReceipt> {
    info!(from = %from.address, to, amount, "sending");
    let signed = build_transfer(chain, config, from, to, amount).await?;
    let txid = broadcast_transaction(chain, &signed).await?;
    info!(%txid, fee = signed.plan.fee(), "broadcast");

    Ok(SendReceipt {
        txid,
        amount,
        fee: signed.plan.fee(),
        fee_rate: signed.plan.fee_rate,
        inputs: signed.plan.inputs.len(),
        change: signed.plan.change(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::testutil::test_key;

    #[test]
    fn test_validate_source() {
        let key = test_key();
        let config = FractalConfig::mainnet();
        let legacy = key.address(AddressType::Legacy, config.network).to_string();
        let taproot = key.address(AddressType::Taproot, config.network).to_string();

        let source = validate_source(&AddressPair::new(&taproot, key.to_wif()), &config).expect("matches");
        assert_eq!(source.ty, AddressType::Taproot);

        let other = KeyMaterial::from_wif("KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn").unwrap();
        let err = validate_source(&AddressPair::new(&legacy, other.to_wif()), &config).unwrap_err();
        assert!(matches!(err, Error::KeyMismatch { .. }));

        let err = validate_source(&AddressPair::new("bogus", key.to_wif()), &config).unwrap_err();
        assert!(matches!(err, Error::InvalidAddress { role: "fromAddress", .. }));

        let err = validate_source(&AddressPair::new(&legacy, "nope"), &config).unwrap_err();
        assert!(matches!(err, Error::InvalidKey(_)));
    }

    #[test]
    fn test_address_pair_debug_hides_wif() {
        let pair = AddressPair::new("bc1qexample", "L1secretwif");
        assert!(!format!("{:?}", pair).contains("L1secretwif"));
    }
}
