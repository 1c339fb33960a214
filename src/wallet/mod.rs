//! Wallet module - UTXO transfers from a single WIF-controlled address
//!
//! # Pipeline
//!
//! ```text
//! send(from, to, amount)
//!     │
//!     ├── validate: classify both addresses, WIF must control fromAddress
//!     ├── list_utxos → confirmed balance must exceed amount
//!     ├── recommended_fees → fastest rate
//!     │
//!     ├── select_coins     smallest-first until amount + fee is covered
//!     ├── fetch raw hex    for every selected input
//!     ├── assemble_psbt    per-source-type input data
//!     ├── sign_psbt        per-source-type signing + finalization
//!     │
//!     └── broadcast → txid
//! ```
//!
//! Selection and assembly are pure; only the steps that talk to the
//! [`ChainData`](crate::chain::ChainData) service are async.

mod assemble;
mod select;
mod send;
mod sign;

pub use assemble::{assemble_psbt, fetch_funding_transactions, FundingTransactions};
pub use select::{select_coins, PlannedOutput, TransactionPlan};
pub use send::{
    broadcast_transaction, build_transfer, confirmed_balance, send, AddressPair, SendReceipt, SignedTransaction,
};
pub use sign::sign_psbt;

#[cfg(test)]
pub(crate) mod testutil {
    use bitcoin::absolute::LockTime;
    use bitcoin::hashes::Hash;
    use bitcoin::transaction::Version;
    use bitcoin::{Amount, OutPoint, Script, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};

    use super::{FundingTransactions, PlannedOutput, TransactionPlan};
    use crate::address::{parse_address, AddressType};
    use crate::chain::UnspentOutput;
    use crate::config::Network;
    use crate::keys::{KeyMaterial, ORIGIN_PATH};

    pub const TEST_MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    pub fn test_key() -> KeyMaterial {
        KeyMaterial::from_mnemonic(TEST_MNEMONIC, ORIGIN_PATH, Network::Bitcoin).expect("derive")
    }

    /// A transaction paying `values` to `script_pubkey`, one output per value.
    pub fn funding_tx(script_pubkey: &Script, values: &[u64], salt: u8) -> Transaction {
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::new(Txid::from_byte_array([salt; 32]), 0),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: values
                .iter()
                .map(|v| TxOut { value: Amount::from_sat(*v), script_pubkey: script_pubkey.to_owned() })
                .collect(),
        }
    }

    /// Spend every output of `prev`: `amount` to a fixed address, the rest minus 500 sats back to `key`.
    pub fn plan_spending(
        key: &KeyMaterial,
        ty: AddressType,
        prev: &Transaction,
        amount: u64,
    ) -> (TransactionPlan, FundingTransactions) {
        let txid = prev.compute_txid();
        let inputs: Vec<UnspentOutput> = prev
            .output
            .iter()
            .enumerate()
            .map(|(vout, out)| UnspentOutput { txid, vout: vout as u32, value: out.value.to_sat(), confirmed: true })
            .collect();
        let total: u64 = inputs.iter().map(|u| u.value).sum();
        let (_, destination) =
            parse_address("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4", Network::Bitcoin, "toAddress").expect("valid");
        let plan = TransactionPlan {
            inputs,
            outputs: vec![
                PlannedOutput { address: destination, value: amount },
                PlannedOutput { address: key.address(ty, Network::Bitcoin), value: total - amount - 500 },
            ],
            estimated_fee: 500,
            fee_rate: 1,
        };
        let funding = FundingTransactions::from([(txid, prev.clone())]);
        (plan, funding)
    }
}
