//! Address classification and key-to-address derivation
//!
//! Classification is purely lexical: a fixed set of patterns per network,
//! tried in the order Legacy → NestedSegwit → NativeSegwit → Taproot.
//! No match means the address is invalid (`None`).

use std::fmt;
use std::str::FromStr;

use bitcoin::secp256k1::Secp256k1;
use bitcoin::{Address, CompressedPublicKey};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::Network;
use crate::error::{Error, Result};

/// Script family of an address. Invalid addresses never make it into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AddressType {
    Legacy,
    NestedSegwit,
    NativeSegwit,
    Taproot,
}

impl AddressType {
    pub const ALL: [AddressType; 4] = [
        AddressType::Legacy,
        AddressType::NestedSegwit,
        AddressType::NativeSegwit,
        AddressType::Taproot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AddressType::Legacy => "legacy",
            AddressType::NestedSegwit => "nested-segwit",
            AddressType::NativeSegwit => "native-segwit",
            AddressType::Taproot => "taproot",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value.trim().to_ascii_lowercase())
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

struct Patterns {
    legacy: Regex,
    nested_segwit: Regex,
    native_segwit: Regex,
    taproot: Regex,
}

impl Patterns {
    fn new(legacy: &str, nested: &str, native: &str, taproot: &str) -> Self {
        let re = |p: &str| Regex::new(p).expect("static address pattern");
        Self { legacy: re(legacy), nested_segwit: re(nested), native_segwit: re(native), taproot: re(taproot) }
    }

    fn classify(&self, address: &str) -> Option<AddressType> {
        if self.legacy.is_match(address) {
            Some(AddressType::Legacy)
        } else if self.nested_segwit.is_match(address) {
            Some(AddressType::NestedSegwit)
        } else if self.native_segwit.is_match(address) {
            Some(AddressType::NativeSegwit)
        } else if self.taproot.is_match(address) {
            Some(AddressType::Taproot)
        } else {
            None
        }
    }
}

static MAINNET: Lazy<Patterns> = Lazy::new(|| {
    Patterns::new(
        r"^1[a-km-zA-HJ-NP-Z1-9]{25,34}$",
        r"^3[a-km-zA-HJ-NP-Z1-9]{25,34}$",
        r"^bc1q[0-9a-z]{35,79}$",
        r"^bc1p[0-9a-z]{39,79}$",
    )
});

static TESTNET: Lazy<Patterns> = Lazy::new(|| {
    Patterns::new(
        r"^[mn][a-km-zA-HJ-NP-Z1-9]{25,34}$",
        r"^2[a-km-zA-HJ-NP-Z1-9]{25,34}$",
        r"^tb1q[0-9a-z]{35,79}$",
        r"^tb1p[0-9a-z]{39,79}$",
    )
});

/// Classify an address for `network`. `None` means invalid.
pub fn classify(address: &str, network: Network) -> Option<AddressType> {
    match network {
        Network::Bitcoin => MAINNET.classify(address),
        Network::Testnet => TESTNET.classify(address),
    }
}

/// Classify and fully decode (checksum, network) an address.
pub fn parse_address(address: &str, network: Network, role: &'static str) -> Result<(AddressType, Address)> {
    let invalid = || Error::InvalidAddress { role, address: address.to_string() };
    let ty = classify(address, network).ok_or_else(invalid)?;
    let parsed = Address::from_str(address)
        .map_err(|_| invalid())?
        .require_network(network.to_bitcoin())
        .map_err(|_| invalid())?;
    Ok((ty, parsed))
}

/// The address of script family `ty` controlled by `public_key`.
pub fn derive_address(public_key: &CompressedPublicKey, ty: AddressType, network: Network) -> Address {
    let net = network.to_bitcoin();
    match ty {
        AddressType::Legacy => Address::p2pkh(public_key.pubkey_hash(), net),
        AddressType::NestedSegwit => Address::p2shwpkh(public_key, net),
        AddressType::NativeSegwit => Address::p2wpkh(public_key, net),
        AddressType::Taproot => {
            let secp = Secp256k1::verification_only();
            let (x_only, _) = public_key.0.x_only_public_key();
            Address::p2tr(&secp, x_only, None, net)
        }
    }
}
