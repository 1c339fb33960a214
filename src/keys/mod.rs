//! Key material for one signing step. Built from a WIF or a mnemonic, held in
//! memory for the duration of a call, never persisted.

mod derive;

pub use derive::{derive_secret_key, DerivationError, ORIGIN_PATH, REVEAL_PATH};

use std::fmt;

use bitcoin::key::{Keypair, TapTweak, TweakedKeypair};
use bitcoin::secp256k1::{Secp256k1, SecretKey, XOnlyPublicKey};
use bitcoin::{Address, CompressedPublicKey, PrivateKey};

use crate::address::{derive_address, AddressType};
use crate::config::Network;
use crate::error::{Error, Result};

/// A keypair with its taproot views: X-only public key and the BIP341-tweaked keypair.
#[derive(Clone)]
pub struct KeyMaterial {
    private_key: PrivateKey,
    keypair: Keypair,
    public_key: CompressedPublicKey,
    x_only: XOnlyPublicKey,
    tweaked: TweakedKeypair,
}

impl KeyMaterial {
    pub fn from_secret_key(secret_key: SecretKey, network: Network) -> Self {
        let secp = Secp256k1::new();
        let keypair = Keypair::from_secret_key(&secp, &secret_key);
        let (x_only, _) = keypair.x_only_public_key();
        Self {
            private_key: PrivateKey::new(secret_key, network.to_bitcoin()),
            keypair,
            public_key: CompressedPublicKey(keypair.public_key()),
            x_only,
            // key-path only: no script tree
            tweaked: keypair.tap_tweak(&secp, None),
        }
    }

    /// Import a compressed-key WIF.
    pub fn from_wif(wif: &str) -> Result<Self> {
        let private_key = PrivateKey::from_wif(wif.trim()).map_err(|e| Error::InvalidKey(format!("WIF: {}", e)))?;
        if !private_key.compressed {
            return Err(Error::InvalidKey("uncompressed WIF keys are not supported".into()));
        }
        let network = match private_key.network {
            bitcoin::NetworkKind::Main => Network::Bitcoin,
            bitcoin::NetworkKind::Test => Network::Testnet,
        };
        Ok(Self::from_secret_key(private_key.inner, network))
    }

    pub fn from_mnemonic(mnemonic: &str, path: &str, network: Network) -> Result<Self> {
        let secret_key = derive_secret_key(mnemonic, None, path, network).map_err(|e| Error::InvalidKey(e.to_string()))?;
        Ok(Self::from_secret_key(secret_key, network))
    }

    pub fn to_wif(&self) -> String { self.private_key.to_wif() }
    pub fn keypair(&self) -> &Keypair { &self.keypair }
    pub fn secret_key(&self) -> SecretKey { self.private_key.inner }
    pub fn public_key(&self) -> &CompressedPublicKey { &self.public_key }
    pub fn x_only_public_key(&self) -> XOnlyPublicKey { self.x_only }
    pub fn tweaked_keypair(&self) -> &TweakedKeypair { &self.tweaked }

    pub fn address(&self, ty: AddressType, network: Network) -> Address {
        derive_address(&self.public_key, ty, network)
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial").field("x_only", &self.x_only).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_ONE_WIF: &str = "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn";
    const TEST_MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_wif_roundtrip() {
        let key = KeyMaterial::from_wif(KEY_ONE_WIF).expect("valid wif");
        assert_eq!(key.to_wif(), KEY_ONE_WIF);
        assert_eq!(
            key.address(AddressType::Legacy, Network::Bitcoin).to_string(),
            "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH"
        );
    }

    #[test]
    fn test_wif_rejected() {
        assert!(matches!(KeyMaterial::from_wif("not-a-wif"), Err(Error::InvalidKey(_))));
        // uncompressed encoding of key 1
        let uncompressed = "5HpHagT65TZzG1PH3CSu63k8DbpvD8s5ip4nEB3kEsreAnchuDf";
        assert!(matches!(KeyMaterial::from_wif(uncompressed), Err(Error::InvalidKey(_))));
    }

    #[test]
    fn test_bip86_first_receive_address() {
        let key = KeyMaterial::from_mnemonic(TEST_MNEMONIC, ORIGIN_PATH, Network::Bitcoin).expect("derive");
        assert_eq!(
            key.address(AddressType::Taproot, Network::Bitcoin).to_string(),
            "bc1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqkedrcr"
        );
    }

    #[test]
    fn test_tweaked_key_matches_taproot_output() {
        let key = KeyMaterial::from_wif(KEY_ONE_WIF).expect("valid wif");
        let address = key.address(AddressType::Taproot, Network::Bitcoin);
        let (tweaked_x_only, _) = key.tweaked_keypair().to_keypair().x_only_public_key();
        let spk = address.script_pubkey();
        let program = &spk.as_bytes()[2..];
        assert_eq!(program, &tweaked_x_only.serialize()[..]);
        assert_ne!(tweaked_x_only, key.x_only_public_key());
    }

    #[test]
    fn test_debug_hides_secret() {
        let key = KeyMaterial::from_wif(KEY_ONE_WIF).expect("valid wif");
        let debug = format!("{:?}", key);
        assert!(!debug.contains(KEY_ONE_WIF));
        assert!(debug.contains("x_only"));
    }
}
