use bitcoin::secp256k1::constants;

pub(crate) type Seed = [u8; constants::SECRET_KEY_SIZE];

pub const NETWORK: bitcoin::Network = bitcoin::Network::Testnet;

// fee = max(estimates) * FEE_MULTIPLIER_NUM / FEE_MULTIPLIER_DEN
pub const FEE_MULTIPLIER_NUM: f64 = 6.0;
pub const FEE_MULTIPLIER_DEN: f64 = 5.0;

pub const TX_VERSION: i32 = 2;
pub const FINAL_SEQUENCE: u32 = 0xFFFFFFFF;

pub const ESPLORA_TESTNET_URL: &str = "https://blockstream.info/testnet/api";
pub const ELECTRUM_TESTNET_URL: &str = "ssl://electrum.blockstream.info:60002";

/// Recipient used when neither the config file nor the command line names one.
pub const DEFAULT_DESTINATION: &str =
    "tb1p8e2gdm52a8rljvsc6zdaja37srtp7wtsmsn73mmusfu2r8zh232sa8cyfl";

pub const DEFAULT_KEY_ENV_VAR: &str = "WALLET_PRIVATE_KEY";

/// Confirmation targets queried when the backend has no bulk fee endpoint.
pub const ELECTRUM_FEE_TARGETS: [usize; 6] = [1, 3, 6, 12, 24, 144];
