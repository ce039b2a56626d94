use std::{fmt, str::FromStr};

use bitcoin::{Address, Network, Script};

use super::{
    error::{Result, WalletError},
    key_material::{KeyMaterial, TweakedKeyPair},
};

pub type AddressMapping = Box<dyn Fn(&KeyMaterial, Network) -> Result<Address>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFormat {
    /// P2PKH
    Legacy,
    /// P2WPKH
    SegwitV0,
    /// P2TR spent through the key path only.
    TaprootKeyPath,
}

impl FromStr for AddressFormat {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "legacy" | "btc" | "p2pkh" => Ok(AddressFormat::Legacy),
            "segwit" | "segwit-v0" | "p2wpkh" => Ok(AddressFormat::SegwitV0),
            "taproot" | "tapRoot" | "taproot-key-path" | "p2tr" => {
                Ok(AddressFormat::TaprootKeyPath)
            }
            other => Err(WalletError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for AddressFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressFormat::Legacy => "legacy",
            AddressFormat::SegwitV0 => "segwit",
            AddressFormat::TaprootKeyPath => "taproot",
        };
        write!(f, "{}", name)
    }
}

// Address derivation, the transaction builder and the signer all go through these two
// functions so the output key can never drift between them.

/// `OP_1 <output key>` for the tweaked key.
pub fn taproot_output_script(tweaked: &TweakedKeyPair) -> Script {
    return Script::new_v1_p2tr_tweaked(tweaked.output_key());
}

pub fn taproot_address(tweaked: &TweakedKeyPair, network: Network) -> Address {
    return Address::p2tr_tweaked(tweaked.output_key(), network);
}

pub fn map_address(format: AddressFormat) -> AddressMapping {
    match format {
        AddressFormat::Legacy => Box::new(|key: &KeyMaterial, network: Network| {
            return Ok(Address::p2pkh(&key.public_key(), network));
        }),
        AddressFormat::SegwitV0 => Box::new(|key: &KeyMaterial, network: Network| {
            return Address::p2wpkh(&key.public_key(), network)
                .map_err(|err| WalletError::InvalidKey(err.to_string()));
        }),
        AddressFormat::TaprootKeyPath => Box::new(|key: &KeyMaterial, network: Network| {
            return Ok(taproot_address(&key.tweaked_key_pair(), network));
        }),
    }
}

pub fn derive_address(format: AddressFormat, key: &KeyMaterial, network: Network) -> Result<Address> {
    return map_address(format)(key, network);
}

/// Same as [`derive_address`] for a format name coming from outside the crate.
pub fn derive_address_str(format: &str, key: &KeyMaterial, network: Network) -> Result<Address> {
    return derive_address(format.parse()?, key, network);
}

/// Parses a recipient and checks it belongs to `network`.
pub fn parse_address(raw: &str, network: Network) -> Result<Address> {
    let address = Address::from_str(raw.trim()).map_err(|err| WalletError::InvalidAddress {
        address: raw.to_string(),
        reason: err.to_string(),
    })?;
    if !address.is_valid_for_network(network) {
        return Err(WalletError::NetworkMismatch {
            address: raw.to_string(),
            network,
        });
    }
    return Ok(address);
}
