//! Single-key bitcoin wallet: derives the legacy, segwit and taproot addresses of one
//! private key and spends the taproot output through the key path.

pub mod bitcoin_wallet;
pub mod configuration;

pub use bitcoin_wallet::{
    address_formats::{derive_address, AddressFormat},
    error::{Result, WalletError},
    key_material::{KeyMaterial, KeyState, TweakedKeyPair},
    transfer::{TaprootTransfer, TransferStage},
};
