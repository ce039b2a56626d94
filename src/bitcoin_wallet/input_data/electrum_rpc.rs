use std::sync::Arc;

use async_trait::async_trait;
use bitcoin::Address;
use electrum_client::{Client, ElectrumApi, ListUnspentRes};
use log::{debug, info};

use super::{BroadcastReceipt, Broadcaster, UnspentOutput, UtxoSource};
use crate::bitcoin_wallet::{
    constants::ELECTRUM_FEE_TARGETS,
    error::{Result, WalletError},
    fee_policy::FeeEstimates,
    spending_path::p2tr_key_path::SignedTransaction,
};

// sat/vB per BTC/kB
const BTC_PER_KB_TO_SAT_PER_VB: f64 = 100_000.0;

/// Electrum server backend. The client is blocking, so every call runs on the
/// blocking thread pool.
pub struct ElectrumRpc {
    client: Arc<Client>,
}

impl ElectrumRpc {
    /// Connects on the blocking pool, like every other call.
    pub async fn new(url: &str) -> Result<Self> {
        debug!("connecting to electrum server {}", url);
        let url = url.to_string();
        let client = tokio::task::spawn_blocking(move || Client::new(&url)).await??;
        return Ok(ElectrumRpc {
            client: Arc::new(client),
        });
    }
}

fn to_unspent(res: &ListUnspentRes) -> Result<UnspentOutput> {
    let vout = u32::try_from(res.tx_pos).map_err(|err| WalletError::MalformedUtxo {
        outpoint: format!("{}:{}", res.tx_hash, res.tx_pos),
        reason: err.to_string(),
    })?;
    return Ok(UnspentOutput {
        txid: res.tx_hash,
        vout,
        value: res.value,
        // mempool entries are reported at height 0
        confirmed: res.height > 0,
    });
}

pub(crate) fn fee_estimates_from_btc_per_kb(targets: &[usize], rates: &[f64]) -> FeeEstimates {
    let mut fees = FeeEstimates::new();
    for (target, rate) in targets.iter().zip(rates.iter()) {
        // the server answers -1 when it has no estimate for a target
        if *rate < 0.0 {
            debug!("no electrum fee estimate for {} blocks", target);
            continue;
        }
        if let Ok(target) = u16::try_from(*target) {
            fees.insert(target, rate * BTC_PER_KB_TO_SAT_PER_VB);
        }
    }
    return fees;
}

#[async_trait]
impl UtxoSource for ElectrumRpc {
    async fn list_unspent(&self, address: &Address) -> Result<Vec<UnspentOutput>> {
        let client = self.client.clone();
        let script_pub_k = address.script_pubkey();
        let history =
            tokio::task::spawn_blocking(move || client.script_list_unspent(&script_pub_k))
                .await??;
        return history.iter().map(to_unspent).collect();
    }

    async fn fee_estimates(&self) -> Result<FeeEstimates> {
        let client = self.client.clone();
        let rates =
            tokio::task::spawn_blocking(move || client.batch_estimate_fee(ELECTRUM_FEE_TARGETS))
                .await??;
        return Ok(fee_estimates_from_btc_per_kb(&ELECTRUM_FEE_TARGETS, &rates));
    }
}

#[async_trait]
impl Broadcaster for ElectrumRpc {
    async fn broadcast(&self, tx: &SignedTransaction) -> Result<BroadcastReceipt> {
        let client = self.client.clone();
        let raw_tx = tx.to_wire_bytes();
        let txid =
            tokio::task::spawn_blocking(move || client.transaction_broadcast_raw(&raw_tx))
                .await??;
        info!("electrum accepted {}", txid);
        return Ok(BroadcastReceipt {
            response: txid.to_string(),
        });
    }
}
