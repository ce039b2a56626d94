use bitcoin::{
    hashes::Hash,
    psbt::Input,
    schnorr::TapTweak,
    secp256k1::{All, Message, Secp256k1},
    util::sighash::{Prevouts, SighashCache},
    SchnorrSig, SchnorrSighashType, Transaction, TxOut, XOnlyPublicKey,
};
use log::debug;

use crate::bitcoin_wallet::{
    address_formats::taproot_output_script,
    error::WalletError,
    key_material::TweakedKeyPair,
    script_services::psbt_factory::UnlockFn,
};

pub fn insert_witness_utxo<'a>(tx_out: TxOut) -> UnlockFn<'a> {
    return Box::new(move |input: &mut Input| {
        input.witness_utxo = Some(tx_out);
        return Ok(());
    });
}

pub fn insert_tap_internal_key<'a>(internal_key: XOnlyPublicKey) -> UnlockFn<'a> {
    return Box::new(move |input: &mut Input| {
        input.tap_internal_key = Some(internal_key);
        return Ok(());
    });
}

/// Key-path signature for `input_index` with SIGHASH_DEFAULT.
///
/// Refuses to sign unless tweaking the input's internal key gives the signer's output
/// key and the spent output pays to that key.
pub fn sign_key_sig<'a>(
    secp: &'a Secp256k1<All>,
    tweaked: &'a TweakedKeyPair,
    current_tx: &'a Transaction,
    prevouts: &'a [TxOut],
    input_index: usize,
) -> UnlockFn<'a> {
    return Box::new(move |input: &mut Input| {
        let internal_key = input.tap_internal_key.ok_or_else(|| {
            WalletError::Signing(format!("input {} has no taproot internal key", input_index))
        })?;
        let (expected_output_key, _) = internal_key.tap_tweak(secp, input.tap_merkle_root);
        if expected_output_key != tweaked.output_key() {
            return Err(WalletError::Signing(format!(
                "internal key {} tweaks to {} but the signing key is {}",
                internal_key,
                expected_output_key.to_inner(),
                tweaked.output_key().to_inner()
            )));
        }

        let witness_utxo = input.witness_utxo.as_ref().ok_or_else(|| {
            WalletError::Signing(format!("input {} has no witness utxo", input_index))
        })?;
        if witness_utxo.script_pubkey != taproot_output_script(tweaked) {
            return Err(WalletError::Signing(format!(
                "input {} spends {} which is not the taproot output of {}",
                input_index,
                witness_utxo.script_pubkey,
                tweaked.output_key().to_inner()
            )));
        }

        let tap_sig = SighashCache::new(current_tx)
            .taproot_key_spend_signature_hash(
                input_index,
                &Prevouts::All(prevouts),
                SchnorrSighashType::Default,
            )
            .map_err(|err| WalletError::Signing(err.to_string()))?;
        let msg = Message::from_slice(&tap_sig.into_inner())
            .map_err(|err| WalletError::Signing(err.to_string()))?;

        let sig = secp.sign_schnorr(&msg, tweaked.key_pair());
        secp.verify_schnorr(&sig, &msg, &tweaked.output_key().to_inner())
            .map_err(|err| WalletError::Signing(err.to_string()))?;
        debug!("signed input {} for output key {}", input_index, tweaked.output_key().to_inner());

        input.tap_key_sig = Some(SchnorrSig {
            sig,
            hash_ty: SchnorrSighashType::Default,
        });
        return Ok(());
    });
}
