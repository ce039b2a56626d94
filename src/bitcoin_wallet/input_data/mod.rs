use async_trait::async_trait;
use bitcoin::{Address, OutPoint, Txid};

use super::{
    error::Result, fee_policy::FeeEstimates, spending_path::p2tr_key_path::SignedTransaction,
};

pub mod electrum_rpc;
pub mod esplora;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentOutput {
    pub txid: Txid,
    pub vout: u32,
    pub value: u64,
    pub confirmed: bool,
}

impl UnspentOutput {
    pub fn outpoint(&self) -> OutPoint {
        return OutPoint::new(self.txid, self.vout);
    }
}

/// Where unspent outputs and fee quotes come from.
///
/// Implementations hit the network; errors are passed back as they are and nothing
/// is retried.
#[async_trait]
pub trait UtxoSource: Send + Sync {
    async fn list_unspent(&self, address: &Address) -> Result<Vec<UnspentOutput>>;
    async fn fee_estimates(&self) -> Result<FeeEstimates>;
}

/// Opaque answer of the relay, usually the txid it accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastReceipt {
    pub response: String,
}

#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(&self, tx: &SignedTransaction) -> Result<BroadcastReceipt>;
}

/// The first confirmed output, in the order the source listed them.
pub fn first_confirmed(utxos: &[UnspentOutput]) -> Option<&UnspentOutput> {
    return utxos.iter().find(|utxo| utxo.confirmed);
}
