use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use bitcoin::{Address, Txid};
use log::{debug, info, warn};
use reqwest::Client;
use serde::Deserialize;

use super::{BroadcastReceipt, Broadcaster, UnspentOutput, UtxoSource};
use crate::bitcoin_wallet::{
    error::{Result, WalletError},
    fee_policy::FeeEstimates,
    spending_path::p2tr_key_path::SignedTransaction,
};

/// Block explorer REST api (`/address/:addr/utxo`, `/fee-estimates`, `/tx`).
pub struct EsploraClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct EsploraUtxo {
    txid: String,
    vout: u32,
    value: u64,
    status: EsploraStatus,
}

#[derive(Debug, Deserialize)]
struct EsploraStatus {
    confirmed: bool,
}

impl TryFrom<EsploraUtxo> for UnspentOutput {
    type Error = WalletError;

    fn try_from(raw: EsploraUtxo) -> Result<Self> {
        let txid = Txid::from_str(&raw.txid).map_err(|err| WalletError::MalformedUtxo {
            outpoint: format!("{}:{}", raw.txid, raw.vout),
            reason: err.to_string(),
        })?;
        return Ok(UnspentOutput {
            txid,
            vout: raw.vout,
            value: raw.value,
            confirmed: raw.status.confirmed,
        });
    }
}

impl EsploraClient {
    /// `timeout` is left to the caller; without one requests wait as long as the server does.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        return Ok(EsploraClient {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        });
    }

    pub fn base_url(&self) -> &str {
        return &self.base_url;
    }
}

pub(crate) fn parse_utxos(body: &str) -> Result<Vec<UnspentOutput>> {
    let raw: Vec<EsploraUtxo> = serde_json::from_str(body)?;
    return raw.into_iter().map(UnspentOutput::try_from).collect();
}

pub(crate) fn parse_fee_estimates(body: &str) -> Result<FeeEstimates> {
    return Ok(serde_json::from_str::<FeeEstimates>(body)?);
}

#[async_trait]
impl UtxoSource for EsploraClient {
    async fn list_unspent(&self, address: &Address) -> Result<Vec<UnspentOutput>> {
        let url = format!("{}/address/{}/utxo", self.base_url, address);
        debug!("GET {}", url);
        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let utxos = parse_utxos(&body)?;
        debug!("{} unspent outputs for {}", utxos.len(), address);
        return Ok(utxos);
    }

    async fn fee_estimates(&self) -> Result<FeeEstimates> {
        let url = format!("{}/fee-estimates", self.base_url);
        debug!("GET {}", url);
        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        return parse_fee_estimates(&body);
    }
}

#[async_trait]
impl Broadcaster for EsploraClient {
    async fn broadcast(&self, tx: &SignedTransaction) -> Result<BroadcastReceipt> {
        let url = format!("{}/tx", self.base_url);
        debug!("POST {} ({} bytes)", url, tx.to_wire_bytes().len());
        let response = self.client.post(&url).body(tx.to_hex()).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!("relay rejected {}: {} {}", tx.txid(), status, body);
            return Err(WalletError::BroadcastRejected {
                status: status.as_u16(),
                body,
            });
        }
        info!("relay accepted {}", body.trim());
        return Ok(BroadcastReceipt {
            response: body.trim().to_string(),
        });
    }
}
