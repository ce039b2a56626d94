use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
    str::FromStr,
    time::Duration,
};

use bitcoin::Network;
use serde::Deserialize;

use crate::bitcoin_wallet::{
    constants::{
        DEFAULT_DESTINATION, DEFAULT_KEY_ENV_VAR, ELECTRUM_TESTNET_URL, ESPLORA_TESTNET_URL,
        NETWORK,
    },
    error::{Result, WalletError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Esplora,
    Electrum,
}

/// Settings read from an optional JSON file; every field falls back to its default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub network: String,
    pub backend: Backend,
    pub esplora_url: String,
    pub electrum_url: String,
    pub destination: String,
    /// Environment variable the private key is read from.
    pub key_env_var: String,
    pub request_timeout_secs: Option<u64>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        return WalletConfig {
            network: NETWORK.to_string(),
            backend: Backend::Esplora,
            esplora_url: ESPLORA_TESTNET_URL.to_string(),
            electrum_url: ELECTRUM_TESTNET_URL.to_string(),
            destination: DEFAULT_DESTINATION.to_string(),
            key_env_var: DEFAULT_KEY_ENV_VAR.to_string(),
            request_timeout_secs: None,
        };
    }
}

impl WalletConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => WalletConfig::from_reader(BufReader::new(File::open(path)?)),
            None => Ok(WalletConfig::default()),
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        return Ok(serde_json::from_reader(reader)?);
    }

    /// Test networks only.
    pub fn network(&self) -> Result<Network> {
        let network = Network::from_str(&self.network).map_err(|err| {
            WalletError::Config(format!("unknown network {:?}: {}", self.network, err))
        })?;
        if network == Network::Bitcoin {
            return Err(WalletError::Config(
                "mainnet is not supported, use testnet, signet or regtest".to_string(),
            ));
        }
        return Ok(network);
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        return self.request_timeout_secs.map(Duration::from_secs);
    }
}
