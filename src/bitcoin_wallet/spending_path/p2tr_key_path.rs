use bitcoin::{
    consensus::encode::{serialize, serialize_hex},
    secp256k1::{All, Secp256k1},
    Transaction, TxOut, Txid,
};
use log::debug;
use miniscript::psbt::PsbtExt;

use crate::bitcoin_wallet::{
    error::{Result, WalletError},
    key_material::TweakedKeyPair,
    script_services::{input_service::sign_key_sig, psbt_factory::UnsignedTransaction},
};

/// A finalized transaction. Read-only: the only way to get one is through
/// [`TaprootKeySigner::sign_and_finalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    tx: Transaction,
    spent_outputs: Vec<TxOut>,
}

impl SignedTransaction {
    pub fn txid(&self) -> Txid {
        return self.tx.txid();
    }

    pub fn transaction(&self) -> &Transaction {
        return &self.tx;
    }

    /// Outputs consumed by the inputs, in input order.
    pub fn spent_outputs(&self) -> &[TxOut] {
        return &self.spent_outputs;
    }

    pub fn to_wire_bytes(&self) -> Vec<u8> {
        return serialize(&self.tx);
    }

    pub fn to_hex(&self) -> String {
        return serialize_hex(&self.tx);
    }
}

pub struct TaprootKeySigner<'a> {
    secp: &'a Secp256k1<All>,
}

impl<'a> TaprootKeySigner<'a> {
    pub fn new(secp: &'a Secp256k1<All>) -> Self {
        return TaprootKeySigner { secp };
    }

    pub fn sign_and_finalize(
        &self,
        unsigned: UnsignedTransaction,
        tweaked: &TweakedKeyPair,
    ) -> Result<SignedTransaction> {
        let mut psbt = unsigned.into_psbt();
        if psbt.inputs.len() != 1 {
            return Err(WalletError::Signing(format!(
                "expected a single input, found {}",
                psbt.inputs.len()
            )));
        }

        let prevouts = psbt
            .inputs
            .iter()
            .enumerate()
            .map(|(index, input)| {
                input.witness_utxo.clone().ok_or_else(|| {
                    WalletError::Signing(format!("input {} has no witness utxo", index))
                })
            })
            .collect::<Result<Vec<TxOut>>>()?;

        let current_tx = psbt.unsigned_tx.clone();
        sign_key_sig(self.secp, tweaked, &current_tx, &prevouts, 0)(&mut psbt.inputs[0])?;

        let finalized = psbt.finalize(self.secp).map_err(|(_, errors)| {
            WalletError::Signing(format!(
                "finalize failed: {}",
                errors
                    .iter()
                    .map(|err| err.to_string())
                    .collect::<Vec<String>>()
                    .join("; ")
            ))
        })?;
        let tx = finalized
            .extract(self.secp)
            .map_err(|err| WalletError::Signing(format!("extract failed: {}", err)))?;

        debug!("finalized {} ({} vbytes)", tx.txid(), tx.vsize());
        return Ok(SignedTransaction {
            tx,
            spent_outputs: prevouts,
        });
    }
}
