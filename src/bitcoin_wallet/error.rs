//! Error type shared by every stage of a transfer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletError {
    /// The supplied private key could not be decoded as a secp256k1 scalar.
    #[error("invalid private key: {0}")]
    InvalidKey(String),

    /// The key supplier has not produced a key yet.
    #[error("no private key available: {0}")]
    KeyUnavailable(String),

    #[error("unsupported address format: {0:?}")]
    UnsupportedFormat(String),

    /// The selected output cannot cover the fee.
    #[error("insufficient funds: {value} <= {fee}")]
    InsufficientFunds { value: u64, fee: f64 },

    #[error("fee estimate source returned no estimates")]
    NoFeeEstimates,

    #[error("malformed fee estimate for target {target}: {rate}")]
    MalformedFeeEstimate { target: u16, rate: f64 },

    #[error("no confirmed unspent outputs for {0}")]
    NoSpendableUtxo(String),

    #[error("malformed utxo {outpoint}: {reason}")]
    MalformedUtxo { outpoint: String, reason: String },

    #[error("invalid amount {amount}: {reason}")]
    InvalidAmount { amount: u64, reason: String },

    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("address {address} is not valid for {network}")]
    NetworkMismatch {
        address: String,
        network: bitcoin::Network,
    },

    /// Internal consistency violation while signing. Never retried.
    #[error("signing failed: {0}")]
    Signing(String),

    #[error("psbt error: {0}")]
    Psbt(#[from] bitcoin::psbt::Error),

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("electrum error: {0}")]
    Electrum(#[from] electrum_client::Error),

    #[error("broadcast rejected with status {status}: {body}")]
    BroadcastRejected { status: u16, body: String },

    /// The transfer already broadcast or stopped on an error; start a new one.
    #[error("transfer already finished at {0}")]
    TransferFinished(String),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WalletError>;
