//! One attempt at moving the taproot balance of a key to a destination.
//!
//! The attempt walks `KeyPending -> KeyReady -> AddressDerived -> UtxoSelected ->
//! AmountComputed -> Built -> Signed -> Broadcast`. The only awaits are the calls into
//! the [`UtxoSource`] and the [`Broadcaster`]; everything between them is plain
//! synchronous code over the values the previous stage produced. When a stage fails the
//! attempt stays at the last stage it reached and the error is handed back untouched.
//!
//! A broadcast, successful or not, and any failed stage end the attempt. Calling
//! `prepare` or `run` again afterwards is refused with [`WalletError::TransferFinished`].

use bitcoin::{
    secp256k1::{All, Secp256k1},
    Address, Network,
};
use log::{debug, info, warn};

use super::{
    address_formats::{taproot_address, taproot_output_script},
    error::{Result, WalletError},
    fee_policy::{compute_fee, compute_send_amount},
    input_data::{first_confirmed, BroadcastReceipt, Broadcaster, UnspentOutput, UtxoSource},
    key_material::KeyState,
    script_services::psbt_factory::build_unsigned_tx,
    spending_path::p2tr_key_path::{SignedTransaction, TaprootKeySigner},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastOutcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    KeyPending,
    KeyReady,
    AddressDerived,
    UtxoSelected,
    AmountComputed,
    Built,
    Signed,
    Broadcast(BroadcastOutcome),
}

/// Everything produced up to and including the signature.
#[derive(Debug, Clone)]
pub struct PreparedTransfer {
    pub source_address: Address,
    pub utxo: UnspentOutput,
    pub fee: f64,
    pub send_amount: u64,
    pub signed: SignedTransaction,
}

#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub prepared: PreparedTransfer,
    pub receipt: BroadcastReceipt,
}

pub struct TaprootTransfer<'a, S: UtxoSource + ?Sized, B: Broadcaster + ?Sized> {
    source: &'a S,
    broadcaster: &'a B,
    network: Network,
    signer: TaprootKeySigner<'a>,
    stage: TransferStage,
    finished: bool,
}

impl<'a, S, B> TaprootTransfer<'a, S, B>
where
    S: UtxoSource + ?Sized,
    B: Broadcaster + ?Sized,
{
    pub fn new(
        secp: &'a Secp256k1<All>,
        source: &'a S,
        broadcaster: &'a B,
        network: Network,
    ) -> Self {
        return TaprootTransfer {
            source,
            broadcaster,
            network,
            signer: TaprootKeySigner::new(secp),
            stage: TransferStage::KeyPending,
            finished: false,
        };
    }

    pub fn stage(&self) -> TransferStage {
        return self.stage;
    }

    /// True once the attempt broadcast or failed.
    pub fn is_finished(&self) -> bool {
        return self.finished;
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            return Err(WalletError::TransferFinished(format!("{:?}", self.stage)));
        }
        return Ok(());
    }

    fn advance(&mut self, next: TransferStage) {
        debug!("transfer {:?} -> {:?}", self.stage, next);
        self.stage = next;
    }

    /// Runs every stage up to `Signed` without broadcasting. A prepared but unsent
    /// attempt can be prepared again.
    pub async fn prepare(
        &mut self,
        key_state: &KeyState,
        destination: &Address,
    ) -> Result<PreparedTransfer> {
        self.ensure_open()?;
        self.stage = TransferStage::KeyPending;
        let prepared = self.build_and_sign(key_state, destination).await;
        if prepared.is_err() {
            self.finished = true;
        }
        return prepared;
    }

    async fn build_and_sign(
        &mut self,
        key_state: &KeyState,
        destination: &Address,
    ) -> Result<PreparedTransfer> {
        let key = key_state.key_material()?;
        if !destination.is_valid_for_network(self.network) {
            return Err(WalletError::NetworkMismatch {
                address: destination.to_string(),
                network: self.network,
            });
        }
        self.advance(TransferStage::KeyReady);

        let tweaked = key.tweaked_key_pair();
        let source_address = taproot_address(&tweaked, self.network);
        self.advance(TransferStage::AddressDerived);

        let utxos = self.source.list_unspent(&source_address).await?;
        let utxo = first_confirmed(&utxos)
            .cloned()
            .ok_or_else(|| WalletError::NoSpendableUtxo(source_address.to_string()))?;
        debug!(
            "selected {} ({} sat) out of {} listed outputs",
            utxo.outpoint(),
            utxo.value,
            utxos.len()
        );
        self.advance(TransferStage::UtxoSelected);

        let fee_estimates = self.source.fee_estimates().await?;
        let fee = compute_fee(&fee_estimates)?;
        let send_amount = compute_send_amount(utxo.value, &fee_estimates)?;
        self.advance(TransferStage::AmountComputed);

        let unsigned = build_unsigned_tx(
            &utxo,
            destination,
            send_amount,
            &taproot_output_script(&tweaked),
            tweaked.internal_key(),
        )?;
        self.advance(TransferStage::Built);

        let signed = self.signer.sign_and_finalize(unsigned, &tweaked)?;
        self.advance(TransferStage::Signed);

        return Ok(PreparedTransfer {
            source_address,
            utxo,
            fee,
            send_amount,
            signed,
        });
    }

    /// [`prepare`](Self::prepare), then a single broadcast attempt.
    pub async fn run(
        &mut self,
        key_state: &KeyState,
        destination: &Address,
    ) -> Result<TransferReceipt> {
        let prepared = self.prepare(key_state, destination).await?;
        self.finished = true;
        match self.broadcaster.broadcast(&prepared.signed).await {
            Ok(receipt) => {
                self.advance(TransferStage::Broadcast(BroadcastOutcome::Success));
                info!(
                    "broadcast {} sending {} sat to {}",
                    prepared.signed.txid(),
                    prepared.send_amount,
                    destination
                );
                return Ok(TransferReceipt { prepared, receipt });
            }
            Err(err) => {
                self.advance(TransferStage::Broadcast(BroadcastOutcome::Failure));
                warn!("broadcast of {} failed: {}", prepared.signed.txid(), err);
                return Err(err);
            }
        }
    }
}
