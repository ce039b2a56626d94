use bitcoin::{OutPoint, PackedLockTime, Script, Sequence, Transaction, TxIn, TxOut, Witness};

use super::constants::{FINAL_SEQUENCE, TX_VERSION};

pub mod p2tr_key_path;

/// One input, one output, nothing else.
pub fn single_create_tx(previous_output: OutPoint, tx_out: TxOut) -> Transaction {
    return Transaction {
        version: TX_VERSION,
        lock_time: PackedLockTime(0),
        input: vec![TxIn {
            previous_output,
            script_sig: Script::new(), // must stay empty for a witness spend
            sequence: Sequence(FINAL_SEQUENCE),
            witness: Witness::default(),
        }],
        output: vec![tx_out],
    };
}
