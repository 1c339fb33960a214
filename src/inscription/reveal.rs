//! Reveal address and script-path spend
//!
//! The reveal address is a P2TR output whose internal key is the reveal
//! key and whose tree is the single envelope leaf. Spending it through that
//! leaf puts the envelope, and therefore the payload, in the witness.

use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::key::Keypair;
use bitcoin::secp256k1::{Message, Secp256k1, XOnlyPublicKey};
use bitcoin::sighash::{Prevouts, SighashCache, TapSighashType};
use bitcoin::taproot::{self, ControlBlock, LeafVersion, TapLeafHash, TaprootBuilder, TaprootSpendInfo};
use bitcoin::transaction::Version;
use bitcoin::{Address, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness};

use super::envelope::build_inscription_script;
use super::orchestrator::CommitTxResult;
use super::Inscription;
use crate::config::Network;
use crate::error::{Error, Result};
use crate::fees::DUST_LIMIT;

/// Everything needed to fund and later spend the envelope leaf.
#[derive(Debug, Clone)]
pub struct RevealScript {
    pub script: ScriptBuf,
    pub spend_info: TaprootSpendInfo,
    pub control_block: ControlBlock,
    pub address: Address,
}

impl RevealScript {
    pub fn new(reveal_key: XOnlyPublicKey, inscription: &Inscription, network: Network) -> Result<Self> {
        let secp = Secp256k1::verification_only();
        let script = build_inscription_script(&reveal_key, inscription)?;

        let spend_info = TaprootBuilder::new()
            .add_leaf(0, script.clone())
            .map_err(|e| Error::Build(format!("taproot tree: {}", e)))?
            .finalize(&secp, reveal_key)
            .map_err(|_| Error::Build("taproot tree is incomplete".into()))?;

        let control_block = spend_info
            .control_block(&(script.clone(), LeafVersion::TapScript))
            .ok_or_else(|| Error::Build("no control block for envelope leaf".into()))?;

        let address = Address::p2tr_tweaked(spend_info.output_key(), network.to_bitcoin());
        Ok(Self { script, spend_info, control_block, address })
    }

    pub fn leaf_hash(&self) -> TapLeafHash {
        TapLeafHash::from_script(&self.script, LeafVersion::TapScript)
    }
}

/// Spend the commit output through the envelope leaf, paying [`DUST_LIMIT`] to
/// `recipient`. Everything above that in the commit output is the reveal fee.
pub fn build_reveal_transaction(
    reveal: &RevealScript,
    commit: &CommitTxResult,
    recipient: &Address,
    keypair: &Keypair,
) -> Result<Transaction> {
    if commit.amount <= DUST_LIMIT {
        return Err(Error::Build(format!("commit output of {} sats cannot pay a reveal", commit.amount)));
    }

    let mut tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::new(commit.txid, commit.vout),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![TxOut { value: Amount::from_sat(DUST_LIMIT), script_pubkey: recipient.script_pubkey() }],
    };

    let prevouts = [TxOut { value: Amount::from_sat(commit.amount), script_pubkey: reveal.address.script_pubkey() }];
    let sighash = SighashCache::new(&tx)
        .taproot_script_spend_signature_hash(0, &Prevouts::All(&prevouts), reveal.leaf_hash(), TapSighashType::Default)
        .map_err(|e| Error::Signing(e.to_string()))?;

    let secp = Secp256k1::signing_only();
    let msg = Message::from_digest(sighash.to_byte_array());
    let signature = taproot::Signature {
        signature: secp.sign_schnorr_no_aux_rand(&msg, keypair),
        sighash_type: TapSighashType::Default,
    };

    let mut witness = Witness::new();
    witness.push(signature.to_vec());
    witness.push(reveal.script.as_bytes());
    witness.push(reveal.control_block.serialize());
    tx.input[0].witness = witness;

    Ok(tx)
}
