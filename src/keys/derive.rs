//! BIP39 mnemonic → BIP32 child key derivation
//!
//! The inscription flow uses two BIP86 leaves of account 0: index 0 funds the
//! commit transaction, index 1 signs the reveal script path.

use bip39::Mnemonic;
use bitcoin::bip32::{DerivationPath, Xpriv};
use bitcoin::secp256k1::{Secp256k1, SecretKey};
use std::str::FromStr;

use crate::config::Network;

pub const ORIGIN_PATH: &str = "m/86'/0'/0'/0/0";
pub const REVEAL_PATH: &str = "m/86'/0'/0'/0/1";

#[derive(Debug, thiserror::Error)]
pub enum DerivationError {
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),
    #[error("Invalid derivation path {path}: {reason}")]
    InvalidPath { path: String, reason: String },
    #[error("Derivation failed: {0}")]
    DerivationFailed(String),
}

/// Derive the secret key at `path` from a mnemonic (empty passphrase when `None`).
pub fn derive_secret_key(
    mnemonic: &str,
    passphrase: Option<&str>,
    path: &str,
    network: Network,
) -> Result<SecretKey, DerivationError> {
    let mnemonic = Mnemonic::parse_normalized(mnemonic)
        .map_err(|e| DerivationError::InvalidMnemonic(e.to_string()))?;
    let seed = mnemonic.to_seed(passphrase.unwrap_or(""));

    let path = DerivationPath::from_str(path).map_err(|e| DerivationError::InvalidPath {
        path: path.to_string(),
        reason: e.to_string(),
    })?;

    let secp = Secp256k1::new();
    let master = Xpriv::new_master(network.to_bitcoin(), &seed)
        .map_err(|e| DerivationError::DerivationFailed(e.to_string()))?;
    let child = master
        .derive_priv(&secp, &path)
        .map_err(|e| DerivationError::DerivationFailed(e.to_string()))?;

    Ok(child.private_key)
}
