//! Signing and finalization
//!
//! All inputs share one key and one script family. Signatures for every
//! input are computed before the PSBT is touched, so a failure on any input
//! leaves nothing half-signed.

use bitcoin::ecdsa;
use bitcoin::hashes::Hash;
use bitcoin::psbt::Psbt;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::secp256k1::{All, Message, Secp256k1};
use bitcoin::sighash::{EcdsaSighashType, Prevouts, SighashCache, TapSighashType};
use bitcoin::taproot;
use bitcoin::{PublicKey, ScriptBuf, Transaction, TxOut, Witness};

use crate::address::AddressType;
use crate::error::{Error, Result};
use crate::keys::KeyMaterial;

struct FinalScripts {
    script_sig: Option<ScriptBuf>,
    witness: Option<Witness>,
}

/// Sign every input of `psbt` with `key`, finalize, and extract the network transaction.
pub fn sign_psbt(mut psbt: Psbt, source_type: AddressType, key: &KeyMaterial) -> Result<Transaction> {
    let secp = Secp256k1::new();
    let finals = match source_type {
        AddressType::Legacy => sign_legacy(&psbt, key, &secp)?,
        AddressType::NestedSegwit | AddressType::NativeSegwit => sign_segwit_v0(&psbt, source_type, key, &secp)?,
        AddressType::Taproot => sign_taproot_key_path(&psbt, key, &secp)?,
    };

    for (input, fin) in psbt.inputs.iter_mut().zip(finals) {
        input.final_script_sig = fin.script_sig;
        input.final_script_witness = fin.witness;
        input.redeem_script = None;
        input.tap_internal_key = None;
    }

    Ok(psbt.extract_tx_unchecked_fee_rate())
}

fn previous_output(psbt: &Psbt, index: usize) -> Result<TxOut> {
    let input = &psbt.inputs[index];
    if let Some(out) = &input.witness_utxo {
        return Ok(out.clone());
    }
    let vout = psbt.unsigned_tx.input[index].previous_output.vout as usize;
    input
        .non_witness_utxo
        .as_ref()
        .and_then(|tx| tx.output.get(vout).cloned())
        .ok_or_else(|| Error::Signing(format!("input {} has no previous output data", index)))
}

fn ecdsa_signature(secp: &Secp256k1<All>, digest: [u8; 32], key: &KeyMaterial) -> ecdsa::Signature {
    let msg = Message::from_digest(digest);
    ecdsa::Signature { signature: secp.sign_ecdsa(&msg, &key.secret_key()), sighash_type: EcdsaSighashType::All }
}

fn push_bytes(bytes: Vec<u8>) -> Result<PushBytesBuf> {
    PushBytesBuf::try_from(bytes).map_err(|e| Error::Signing(format!("push: {}", e)))
}

fn sign_legacy(psbt: &Psbt, key: &KeyMaterial, secp: &Secp256k1<All>) -> Result<Vec<FinalScripts>> {
    let cache = SighashCache::new(&psbt.unsigned_tx);
    let pubkey = PublicKey::from(*key.public_key());

    (0..psbt.inputs.len())
        .map(|i| {
            if psbt.inputs[i].non_witness_utxo.is_none() {
                return Err(Error::Signing(format!("legacy input {} lacks its previous transaction", i)));
            }
            let prev_out = previous_output(psbt, i)?;
            let sighash = cache
                .legacy_signature_hash(i, &prev_out.script_pubkey, EcdsaSighashType::All.to_u32())
                .map_err(|e| Error::Signing(e.to_string()))?;
            let sig = ecdsa_signature(secp, sighash.to_byte_array(), key);
            let script_sig = Builder::new().push_slice(push_bytes(sig.to_vec())?).push_key(&pubkey).into_script();
            Ok(FinalScripts { script_sig: Some(script_sig), witness: None })
        })
        .collect()
}

fn sign_segwit_v0(
    psbt: &Psbt,
    source_type: AddressType,
    key: &KeyMaterial,
    secp: &Secp256k1<All>,
) -> Result<Vec<FinalScripts>> {
    let mut cache = SighashCache::new(&psbt.unsigned_tx);
    let mut finals = Vec::with_capacity(psbt.inputs.len());

    for (i, input) in psbt.inputs.iter().enumerate() {
        let prev_out = input
            .witness_utxo
            .as_ref()
            .ok_or_else(|| Error::Signing(format!("segwit input {} lacks its witness UTXO", i)))?;

        // nested: the P2WPKH program lives in the redeem script
        let (program, script_sig) = if source_type == AddressType::NestedSegwit {
            let redeem = input
                .redeem_script
                .clone()
                .ok_or_else(|| Error::Signing(format!("nested input {} lacks its redeem script", i)))?;
            let script_sig = Builder::new().push_slice(push_bytes(redeem.to_bytes())?).into_script();
            (redeem, Some(script_sig))
        } else {
            (prev_out.script_pubkey.clone(), None)
        };

        let sighash = cache
            .p2wpkh_signature_hash(i, &program, prev_out.value, EcdsaSighashType::All)
            .map_err(|e| Error::Signing(e.to_string()))?;
        let sig = ecdsa_signature(secp, sighash.to_byte_array(), key);
        finals.push(FinalScripts { script_sig, witness: Some(Witness::p2wpkh(&sig, &key.public_key().0)) });
    }

    Ok(finals)
}

fn sign_taproot_key_path(psbt: &Psbt, key: &KeyMaterial, secp: &Secp256k1<All>) -> Result<Vec<FinalScripts>> {
    let prevouts = psbt
        .inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            input
                .witness_utxo
                .clone()
                .ok_or_else(|| Error::Signing(format!("taproot input {} lacks its witness UTXO", i)))
        })
        .collect::<Result<Vec<TxOut>>>()?;

    let mut cache = SighashCache::new(&psbt.unsigned_tx);
    let signer = key.tweaked_keypair().to_keypair();

    (0..prevouts.len())
        .map(|i| {
            let sighash = cache
                .taproot_key_spend_signature_hash(i, &Prevouts::All(&prevouts), TapSighashType::Default)
                .map_err(|e| Error::Signing(e.to_string()))?;
            let msg = Message::from_digest(sighash.to_byte_array());
            let signature = secp.sign_schnorr_no_aux_rand(&msg, &signer);
            let sig = taproot::Signature { signature, sighash_type: TapSighashType::Default };
            Ok(FinalScripts { script_sig: None, witness: Some(Witness::p2tr_key_spend(&sig)) })
        })
        .collect()
}
