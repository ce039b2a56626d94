use bitcoin::{
    psbt::{Input, PartiallySignedTransaction},
    Address, Script, Transaction, TxOut, XOnlyPublicKey,
};
use log::debug;

use crate::bitcoin_wallet::{
    error::{Result, WalletError},
    input_data::UnspentOutput,
    script_services::input_service::{insert_tap_internal_key, insert_witness_utxo},
    spending_path::single_create_tx,
};

/// Fills in one field of a psbt input.
pub type UnlockFn<'a> = Box<dyn FnOnce(&mut Input) -> Result<()> + 'a>;

/// A transaction skeleton that still needs its key-path signature.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsignedTransaction {
    psbt: PartiallySignedTransaction,
}

impl UnsignedTransaction {
    pub fn psbt(&self) -> &PartiallySignedTransaction {
        return &self.psbt;
    }

    pub fn unsigned_tx(&self) -> &Transaction {
        return &self.psbt.unsigned_tx;
    }

    pub(crate) fn into_psbt(self) -> PartiallySignedTransaction {
        return self.psbt;
    }
}

/// Wraps `unsigned_tx` in a psbt and runs each input's unlock functions over it, in order.
pub fn create_partially_signed_tx<'a>(
    unsigned_tx: Transaction,
    unlock_func: Vec<Vec<UnlockFn<'a>>>,
) -> Result<PartiallySignedTransaction> {
    let mut psbt = PartiallySignedTransaction::from_unsigned_tx(unsigned_tx)?;
    for (input, func_list) in psbt.inputs.iter_mut().zip(unlock_func) {
        for func in func_list {
            func(&mut *input)?;
        }
    }
    return Ok(psbt);
}

/// Spends all of `utxo` (minus the fee already taken out of `send_amount`) to `destination`.
///
/// The input carries the spent output and the taproot internal key so the signer can
/// compute the key-path sighash and check which key it is signing for.
pub fn build_unsigned_tx(
    utxo: &UnspentOutput,
    destination: &Address,
    send_amount: u64,
    account_output_script: &Script,
    internal_key: XOnlyPublicKey,
) -> Result<UnsignedTransaction> {
    let outpoint = utxo.outpoint();
    if utxo.value == 0 {
        return Err(WalletError::MalformedUtxo {
            outpoint: outpoint.to_string(),
            reason: "value must be positive".to_string(),
        });
    }
    if account_output_script.is_empty() {
        return Err(WalletError::MalformedUtxo {
            outpoint: outpoint.to_string(),
            reason: "spent output script is missing".to_string(),
        });
    }
    if send_amount == 0 {
        return Err(WalletError::InvalidAmount {
            amount: send_amount,
            reason: "nothing left to send".to_string(),
        });
    }
    if send_amount > utxo.value {
        return Err(WalletError::InvalidAmount {
            amount: send_amount,
            reason: format!("exceeds the spent output value {}", utxo.value),
        });
    }

    let unsigned_tx = single_create_tx(
        outpoint,
        TxOut {
            value: send_amount,
            script_pubkey: destination.script_pubkey(),
        },
    );
    let spent_output = TxOut {
        value: utxo.value,
        script_pubkey: account_output_script.clone(),
    };
    let psbt = create_partially_signed_tx(
        unsigned_tx,
        vec![vec![
            insert_witness_utxo(spent_output),
            insert_tap_internal_key(internal_key),
        ]],
    )?;
    debug!(
        "built {} spending {} ({} sat) to {} ({} sat)",
        psbt.unsigned_tx.txid(),
        outpoint,
        utxo.value,
        destination,
        send_amount
    );
    return Ok(UnsignedTransaction { psbt });
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bitcoin::{secp256k1::Secp256k1, Txid};

    use super::*;
    use crate::bitcoin_wallet::{
        address_formats::{parse_address, taproot_output_script},
        constants::{DEFAULT_DESTINATION, FINAL_SEQUENCE, NETWORK},
        key_material::KeyMaterial,
    };

    const SEED: &str = "81b637d8fcd2c6da6359e6963113a1170de795e4b725b84d1e0b4cfd9ec58ce9";

    fn utxo(value: u64) -> UnspentOutput {
        return UnspentOutput {
            txid: Txid::from_str(
                "b8ef12c0a5b8c2d2b8c7d8e4f6a5e3a1c9e2b5d7f1a3c5e7b9d1f3a5c7e9b1d3",
            )
            .unwrap(),
            vout: 1,
            value,
            confirmed: true,
        };
    }

    #[test]
    fn builds_one_input_one_output() {
        let secp = Secp256k1::new();
        let key = KeyMaterial::new(&secp, SEED).unwrap();
        let account_script = taproot_output_script(&key.tweaked_key_pair());
        let destination = parse_address(DEFAULT_DESTINATION, NETWORK).unwrap();
        let spent = utxo(100_000);

        let unsigned = build_unsigned_tx(
            &spent,
            &destination,
            99_400,
            &account_script,
            key.x_only_public_key(),
        )
        .unwrap();

        let tx = unsigned.unsigned_tx();
        assert_eq!(tx.version, 2);
        assert_eq!(tx.input.len(), 1);
        assert_eq!(tx.output.len(), 1);
        assert_eq!(tx.input[0].previous_output, spent.outpoint());
        assert_eq!(tx.input[0].sequence.0, FINAL_SEQUENCE);
        assert!(tx.input[0].script_sig.is_empty());
        assert_eq!(tx.output[0].value, 99_400);
        assert_eq!(tx.output[0].script_pubkey, destination.script_pubkey());

        let input = &unsigned.psbt().inputs[0];
        let witness_utxo = input.witness_utxo.as_ref().unwrap();
        assert_eq!(witness_utxo.value, 100_000);
        assert_eq!(witness_utxo.script_pubkey, account_script);
        assert_eq!(input.tap_internal_key, Some(key.x_only_public_key()));
        assert!(input.tap_key_sig.is_none());
    }

    #[test]
    fn rejects_malformed_utxo() {
        let secp = Secp256k1::new();
        let key = KeyMaterial::new(&secp, SEED).unwrap();
        let account_script = taproot_output_script(&key.tweaked_key_pair());
        let destination = parse_address(DEFAULT_DESTINATION, NETWORK).unwrap();

        assert!(matches!(
            build_unsigned_tx(&utxo(0), &destination, 1, &account_script, key.x_only_public_key()),
            Err(WalletError::MalformedUtxo { .. })
        ));
        assert!(matches!(
            build_unsigned_tx(&utxo(1_000), &destination, 1, &Script::new(), key.x_only_public_key()),
            Err(WalletError::MalformedUtxo { .. })
        ));
    }

    #[test]
    fn rejects_amounts_outside_the_utxo() {
        let secp = Secp256k1::new();
        let key = KeyMaterial::new(&secp, SEED).unwrap();
        let account_script = taproot_output_script(&key.tweaked_key_pair());
        let destination = parse_address(DEFAULT_DESTINATION, NETWORK).unwrap();

        assert!(matches!(
            build_unsigned_tx(&utxo(1_000), &destination, 0, &account_script, key.x_only_public_key()),
            Err(WalletError::InvalidAmount { amount: 0, .. })
        ));
        assert!(matches!(
            build_unsigned_tx(&utxo(1_000), &destination, 1_001, &account_script, key.x_only_public_key()),
            Err(WalletError::InvalidAmount { amount: 1_001, .. })
        ));
    }
}
