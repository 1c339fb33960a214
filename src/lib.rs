//! Fractal: fee-aware UTXO transfers and commit/reveal inscriptions.
//!
//! # Architecture
//!
//! ```text
//! send(from, to, amount)                  inscribe(mnemonic, recipient, payload)
//!   │                                       │
//!   │                                       ├── funding check (confirmed UTXOs)
//!   │                                       ├── RevealScript (envelope leaf → P2TR)
//!   │                                       ├── send(origin → reveal address)   ◄── commit
//!   │                                       ├── reveal tx (script-path spend)
//!   │                                       └── RetryPolicy → broadcast          ◄── reveal
//!   │
//!   ├── address::classify     legacy / nested-segwit / native-segwit / taproot
//!   ├── wallet::select_coins  smallest-first, fee re-estimated per input
//!   ├── wallet::assemble_psbt per-source-type input data
//!   ├── wallet::sign_psbt     per-source-type signatures
//!   └── ChainData             UTXOs, fee rates, raw tx hex, broadcast
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `address` | Address classification and key-to-address derivation |
//! | `fees` | Size table, fee and reveal-fee estimates |
//! | `wallet` | Coin selection, PSBT assembly, signing, `send` |
//! | `inscription` | Envelope, reveal transaction, retry policy, `inscribe` |
//! | `keys` | WIF import and BIP86 derivation |
//! | `chain` | `ChainData` trait and the mempool REST client |
//!
//! # Features
//!
//! - `mempool` (default) - `MempoolClient` over reqwest, and the `fractal` binary
//!
//! # Usage
//!
//! ```ignore
//! use fractal::{send, AddressPair, FractalConfig, MempoolClient};
//!
//! let config = FractalConfig::from_env();
//! let chain = MempoolClient::from_config(&config)?;
//! let from = AddressPair::new("bc1q...", "L1...");
//! let receipt = send(&chain, &config, &from, "bc1p...", 10_000).await?;
//! println!("{}", receipt.txid);
//! ```

pub mod address;
pub mod chain;
pub mod config;
pub mod error;
pub mod fees;
pub mod inscription;
pub mod keys;
pub mod logging;
pub mod wallet;

pub use address::{classify, parse_address, AddressType};
pub use chain::{ChainData, ChainError, FeeRates, UnspentOutput, UtxoSet};
#[cfg(feature = "mempool")]
pub use chain::MempoolClient;
pub use config::{FractalConfig, Network};
pub use error::{Error, ErrorKind, Result};
pub use fees::{estimate_fee, estimate_reveal_fee, estimate_size, DUST_LIMIT};
pub use inscription::{inscribe, InscribeResult, Inscription, RetryPolicy};
pub use keys::KeyMaterial;
pub use wallet::{confirmed_balance, send, AddressPair, SendReceipt};
