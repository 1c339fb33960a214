//! In-memory chain-data service for end-to-end tests.
//!
//! Funding transactions are real transactions paying real addresses, so the
//! hex served for them decodes and matches the listed UTXOs.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode::serialize_hex;
use bitcoin::hashes::Hash;
use bitcoin::transaction::Version;
use bitcoin::{Address, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use fractal::{AddressType, ChainData, ChainError, FeeRates, KeyMaterial, Network, UnspentOutput, UtxoSet};
use tokio::time::Instant;

pub const TEST_MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

pub fn wallet_key(network: Network) -> KeyMaterial {
    KeyMaterial::from_mnemonic(TEST_MNEMONIC, fractal::keys::ORIGIN_PATH, network).expect("derive")
}

pub fn other_key(network: Network) -> KeyMaterial {
    KeyMaterial::from_mnemonic(TEST_MNEMONIC, "m/84'/0'/0'/0/7", network).expect("derive")
}

pub fn address_of(key: &KeyMaterial, ty: AddressType, network: Network) -> Address {
    key.address(ty, network)
}

#[derive(Default)]
struct State {
    utxos: HashMap<String, Vec<UnspentOutput>>,
    raw: HashMap<Txid, String>,
    // None accepts, Some(reason) rejects; empty accepts everything
    scripted: VecDeque<Option<String>>,
    attempts: Vec<Instant>,
    accepted: Vec<Transaction>,
    next_salt: u8,
}

pub struct FakeChain {
    fees: FeeRates,
    state: Mutex<State>,
}

impl FakeChain {
    pub fn new(fastest_fee: u64) -> Self {
        Self {
            fees: FeeRates { fastest_fee, half_hour_fee: fastest_fee, hour_fee: fastest_fee, ..FeeRates::default() },
            state: Mutex::new(State::default()),
        }
    }

    /// Create a transaction paying `values` to `address` and serve it.
    pub fn fund(&self, address: &Address, values: &[u64]) -> Transaction {
        self.fund_with(address, values, true, true)
    }

    pub fn fund_unconfirmed(&self, address: &Address, values: &[u64]) -> Transaction {
        self.fund_with(address, values, false, true)
    }

    /// Listed UTXOs whose raw transaction the service cannot return.
    pub fn fund_without_hex(&self, address: &Address, values: &[u64]) -> Transaction {
        self.fund_with(address, values, true, false)
    }

    fn fund_with(&self, address: &Address, values: &[u64], confirmed: bool, serve_hex: bool) -> Transaction {
        let mut state = self.state.lock().unwrap();
        state.next_salt += 1;
        let tx = Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::new(Txid::from_byte_array([state.next_salt; 32]), 0),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: values
                .iter()
                .map(|v| TxOut { value: Amount::from_sat(*v), script_pubkey: address.script_pubkey() })
                .collect(),
        };
        let txid = tx.compute_txid();
        if serve_hex {
            state.raw.insert(txid, serialize_hex(&tx));
        }
        let listed = state.utxos.entry(address.to_string()).or_default();
        for (vout, value) in values.iter().enumerate() {
            listed.push(UnspentOutput { txid, vout: vout as u32, value: *value, confirmed });
        }
        tx
    }

    /// Reject the next `count` broadcasts with `reason`.
    pub fn reject_next(&self, count: usize, reason: &str) {
        self.accept_then_reject(0, count, reason);
    }

    /// Accept `accept` broadcasts, then reject `reject` with `reason`.
    pub fn accept_then_reject(&self, accept: usize, reject: usize, reason: &str) {
        let mut state = self.state.lock().unwrap();
        state.scripted.extend(std::iter::repeat(None).take(accept));
        state.scripted.extend(std::iter::repeat(Some(reason.to_string())).take(reject));
    }

    pub fn broadcast_attempts(&self) -> Vec<Instant> {
        self.state.lock().unwrap().attempts.clone()
    }

    pub fn accepted(&self) -> Vec<Transaction> {
        self.state.lock().unwrap().accepted.clone()
    }
}

#[async_trait]
impl ChainData for FakeChain {
    async fn list_utxos(&self, address: &str) -> Result<UtxoSet, ChainError> {
        let state = self.state.lock().unwrap();
        Ok(UtxoSet::from_outputs(state.utxos.get(address).cloned().unwrap_or_default()))
    }

    async fn recommended_fees(&self) -> Result<FeeRates, ChainError> {
        Ok(self.fees)
    }

    async fn raw_transaction_hex(&self, txid: &Txid) -> Result<String, ChainError> {
        let state = self.state.lock().unwrap();
        state.raw.get(txid).cloned().ok_or_else(|| ChainError::NotFound(txid.to_string()))
    }

    async fn broadcast(&self, raw_hex: &str) -> Result<Txid, ChainError> {
        let mut state = self.state.lock().unwrap();
        state.attempts.push(Instant::now());
        if let Some(Some(reason)) = state.scripted.pop_front() {
            return Err(ChainError::Rejected(reason));
        }
        let bytes = hex::decode(raw_hex).map_err(|e| ChainError::Decode(e.to_string()))?;
        let tx: Transaction = bitcoin::consensus::deserialize(&bytes).map_err(|e| ChainError::Decode(e.to_string()))?;
        let txid = tx.compute_txid();
        state.raw.insert(txid, raw_hex.to_string());
        state.accepted.push(tx);
        Ok(txid)
    }
}
