//! Commit/reveal sequencing
//!
//! `ValidatingFunding → BuildingCommit → AwaitingCommitAccepted →
//! BuildingReveal → BroadcastingReveal(n) → Done | Failed`
//!
//! Once the commit is broadcast every failure carries its txid, so the funds
//! parked at the reveal address can be recovered by hand.

use std::fmt;

use bitcoin::consensus::encode::serialize_hex;
use bitcoin::{Address, Txid};
use serde::Serialize;
use tracing::{debug, info};

use super::reveal::{build_reveal_transaction, RevealScript};
use super::{inscription_id, Inscription};
use crate::address::{parse_address, AddressType};
use crate::chain::ChainData;
use crate::config::FractalConfig;
use crate::error::{Error, Result};
use crate::fees::{estimate_reveal_fee, DUST_LIMIT};
use crate::keys::{KeyMaterial, ORIGIN_PATH, REVEAL_PATH};
use crate::wallet::{send, AddressPair};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InscribePhase {
    ValidatingFunding,
    BuildingCommit,
    AwaitingCommitAccepted,
    BuildingReveal,
    BroadcastingReveal(u32),
    Done,
}

impl fmt::Display for InscribePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InscribePhase::ValidatingFunding => write!(f, "validating-funding"),
            InscribePhase::BuildingCommit => write!(f, "building-commit"),
            InscribePhase::AwaitingCommitAccepted => write!(f, "awaiting-commit-accepted"),
            InscribePhase::BuildingReveal => write!(f, "building-reveal"),
            InscribePhase::BroadcastingReveal(attempt) => write!(f, "broadcasting-reveal({})", attempt),
            InscribePhase::Done => write!(f, "done"),
        }
    }
}

/// The funded output at the reveal address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommitTxResult {
    pub txid: Txid,
    pub vout: u32,
    pub amount: u64,
}

/// The inscription-carrying output of the reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RevealTxResult {
    pub txid: Txid,
    pub vout: u32,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InscribeResult {
    pub inscription_id: String,
    pub commit: CommitTxResult,
    pub reveal: RevealTxResult,
    pub reveal_address: String,
    pub recipient: String,
    pub fee_rate: u64,
    pub reveal_attempts: u32,
}

/// Inscribe `inscription` using the BIP86 keys of `mnemonic`.
///
/// The origin address (first BIP86 receive address) pays for everything.
/// The inscription goes to `recipient`, or back to the origin when `None`.
pub async fn inscribe<C: ChainData + ?Sized>(
    chain: &C,
    config: &FractalConfig,
    mnemonic: &str,
    recipient: Option<&str>,
    inscription: &Inscription,
) -> Result<InscribeResult> {
    let network = config.network;
    let origin = KeyMaterial::from_mnemonic(mnemonic, ORIGIN_PATH, network)?;
    let reveal_key = KeyMaterial::from_mnemonic(mnemonic, REVEAL_PATH, network)?;
    let origin_address = origin.address(AddressType::Taproot, network);
    let recipient: Address = match recipient {
        Some(r) => parse_address(r, network, "recipient")?.1,
        None => origin_address.clone(),
    };

    info!(phase = %InscribePhase::ValidatingFunding, origin = %origin_address, "inscribing");
    let utxos = chain.list_utxos(&origin_address.to_string()).await?;
    if utxos.confirmed.is_empty() {
        return Err(Error::NoFundingUtxo { address: origin_address.to_string() });
    }

    let reveal = RevealScript::new(reveal_key.x_only_public_key(), inscription, network)?;
    let fee_rate = chain.recommended_fees().await?.fastest_fee;
    let reveal_fee = estimate_reveal_fee(inscription.payload_len(), fee_rate);
    let required_amount = reveal_fee + DUST_LIMIT;
    // The reveal must pay a fee out of the commit output; check before anything is broadcast.
    if required_amount <= DUST_LIMIT {
        return Err(Error::DataUnavailable(format!(
            "recommended fee rate of {} sat/vB cannot pay a reveal",
            fee_rate
        )));
    }
    info!(
        phase = %InscribePhase::BuildingCommit,
        reveal_address = %reveal.address,
        payload_bytes = inscription.payload_len(),
        fee_rate,
        reveal_fee,
        required_amount,
        "funding reveal address"
    );

    let from = AddressPair::new(origin_address.to_string(), origin.to_wif());
    let receipt = send(chain, config, &from, &reveal.address.to_string(), required_amount).await?;
    let commit = CommitTxResult { txid: receipt.txid, vout: 0, amount: required_amount };
    info!(phase = %InscribePhase::AwaitingCommitAccepted, commit_txid = %commit.txid, "commit broadcast");

    let reveal_tx = build_reveal_transaction(&reveal, &commit, &recipient, reveal_key.keypair())
        .map_err(|e| Error::RevealBuildFailed { commit_txid: commit.txid, reason: e.to_string() })?;
    let raw_hex = serialize_hex(&reveal_tx);
    debug!(phase = %InscribePhase::BuildingReveal, txid = %reveal_tx.compute_txid(), raw = %raw_hex, "reveal signed");

    let raw = raw_hex.as_str();
    let (reveal_txid, attempts) = config
        .retry
        .run(move |attempt| async move {
            debug!(phase = %InscribePhase::BroadcastingReveal(attempt), "broadcasting reveal");
            chain.broadcast(raw).await.map(|txid| (txid, attempt))
        })
        .await
        .map_err(|exhausted| Error::RevealBroadcastExhausted {
            commit_txid: commit.txid,
            attempts: exhausted.attempts,
            last_error: exhausted.last_error.to_string(),
        })?;

    let result = InscribeResult {
        inscription_id: inscription_id(&reveal_txid),
        commit,
        reveal: RevealTxResult { txid: reveal_txid, vout: 0, amount: DUST_LIMIT },
        reveal_address: reveal.address.to_string(),
        recipient: recipient.to_string(),
        fee_rate,
        reveal_attempts: attempts,
    };
    info!(phase = %InscribePhase::Done, inscription_id = %result.inscription_id, attempts, "inscribed");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display() {
        assert_eq!(InscribePhase::ValidatingFunding.to_string(), "validating-funding");
        assert_eq!(InscribePhase::BroadcastingReveal(3).to_string(), "broadcasting-reveal(3)");
    }
}
