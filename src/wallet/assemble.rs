//! PSBT assembly
//!
//! Turns a [`TransactionPlan`] into an unsigned PSBT, attaching to every input
//! the previous-output data its script family needs for signing:
//!
//! | Source | Attached |
//! |--------|----------|
//! | legacy | full previous transaction |
//! | nested-segwit | witness UTXO + P2WPKH redeem script |
//! | native-segwit | witness UTXO |
//! | taproot | witness UTXO + x-only internal key |

use std::collections::HashMap;

use bitcoin::absolute::LockTime;
use bitcoin::psbt::{Input as PsbtInput, Psbt};
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use tracing::debug;

use super::select::TransactionPlan;
use crate::address::AddressType;
use crate::chain::{ChainData, ChainError, UnspentOutput};
use crate::error::{Error, Result};
use crate::keys::KeyMaterial;

/// Previous transactions of the selected inputs, keyed by txid.
pub type FundingTransactions = HashMap<Txid, Transaction>;

/// Fetch and decode the raw transaction behind every selected input.
///
/// Any input without a usable hex aborts the whole build.
pub async fn fetch_funding_transactions<C: ChainData + ?Sized>(
    chain: &C,
    inputs: &[UnspentOutput],
) -> Result<FundingTransactions> {
    let mut funding = FundingTransactions::new();
    for utxo in inputs {
        if funding.contains_key(&utxo.txid) {
            continue;
        }
        let raw = match chain.raw_transaction_hex(&utxo.txid).await {
            Ok(raw) if !raw.trim().is_empty() => raw,
            Ok(_) | Err(ChainError::NotFound(_)) => return Err(Error::MissingRawTransaction(utxo.txid)),
            Err(e) => return Err(e.into()),
        };
        let tx = decode_transaction(&raw)
            .map_err(|e| Error::DataUnavailable(format!("transaction {}: {}", utxo.txid, e)))?;
        if tx.compute_txid() != utxo.txid {
            return Err(Error::DataUnavailable(format!(
                "hex served for {} decodes to {}",
                utxo.txid,
                tx.compute_txid()
            )));
        }
        debug!(txid = %utxo.txid, bytes = raw.len() / 2, "fetched funding transaction");
        funding.insert(utxo.txid, tx);
    }
    Ok(funding)
}

fn decode_transaction(raw: &str) -> std::result::Result<Transaction, String> {
    let bytes = hex::decode(raw.trim()).map_err(|e| format!("bad hex: {}", e))?;
    bitcoin::consensus::deserialize(&bytes).map_err(|e| format!("bad encoding: {}", e))
}

/// Build the unsigned PSBT for `plan`, spending outputs owned by `key` under `source_type`.
pub fn assemble_psbt(
    plan: &TransactionPlan,
    funding: &FundingTransactions,
    source_type: AddressType,
    key: &KeyMaterial,
) -> Result<Psbt> {
    let unsigned = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: plan
            .inputs
            .iter()
            .map(|u| TxIn {
                previous_output: OutPoint::new(u.txid, u.vout),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            })
            .collect(),
        output: plan
            .outputs
            .iter()
            .map(|o| TxOut { value: Amount::from_sat(o.value), script_pubkey: o.address.script_pubkey() })
            .collect(),
    };

    let mut psbt = Psbt::from_unsigned_tx(unsigned).map_err(|e| Error::Build(e.to_string()))?;

    for (input, utxo) in psbt.inputs.iter_mut().zip(&plan.inputs) {
        let funding_tx = funding.get(&utxo.txid).ok_or(Error::MissingRawTransaction(utxo.txid))?;
        let prev_out = funding_tx
            .output
            .get(utxo.vout as usize)
            .cloned()
            .ok_or_else(|| Error::Build(format!("{}:{} does not exist", utxo.txid, utxo.vout)))?;
        if prev_out.value.to_sat() != utxo.value {
            return Err(Error::DataUnavailable(format!(
                "{}:{} holds {} sats, service reported {}",
                utxo.txid,
                utxo.vout,
                prev_out.value.to_sat(),
                utxo.value
            )));
        }
        populate_input(input, source_type, key, funding_tx, prev_out);
        debug!(txid = %utxo.txid, vout = utxo.vout, value = utxo.value, source = %source_type, "input attached");
    }

    Ok(psbt)
}

fn populate_input(
    input: &mut PsbtInput,
    source_type: AddressType,
    key: &KeyMaterial,
    funding_tx: &Transaction,
    prev_out: TxOut,
) {
    match source_type {
        AddressType::Legacy => {
            input.non_witness_utxo = Some(funding_tx.clone());
        }
        AddressType::NestedSegwit => {
            input.witness_utxo = Some(prev_out);
            input.redeem_script = Some(ScriptBuf::new_p2wpkh(&key.public_key().wpubkey_hash()));
        }
        AddressType::NativeSegwit => {
            input.witness_utxo = Some(prev_out);
        }
        AddressType::Taproot => {
            input.witness_utxo = Some(prev_out);
            input.tap_internal_key = Some(key.x_only_public_key());
        }
    }
}
