//! How much of a single output reaches the recipient.
//!
//! The fee is the largest quoted estimate with a 20% safety margin, taken as a flat
//! number of satoshis. Whatever remains goes to the destination; there is no change.

use std::collections::BTreeMap;

use log::debug;

use super::{
    constants::{FEE_MULTIPLIER_DEN, FEE_MULTIPLIER_NUM},
    error::{Result, WalletError},
};

/// Confirmation target in blocks -> quoted fee.
pub type FeeEstimates = BTreeMap<u16, f64>;

pub fn max_estimate(fee_estimates: &FeeEstimates) -> Result<f64> {
    let mut max: Option<f64> = None;
    for (target, rate) in fee_estimates {
        if !rate.is_finite() || *rate < 0.0 {
            return Err(WalletError::MalformedFeeEstimate {
                target: *target,
                rate: *rate,
            });
        }
        max = Some(max.map_or(*rate, |m| m.max(*rate)));
    }
    return max.ok_or(WalletError::NoFeeEstimates);
}

pub fn compute_fee(fee_estimates: &FeeEstimates) -> Result<f64> {
    return Ok(max_estimate(fee_estimates)? * FEE_MULTIPLIER_NUM / FEE_MULTIPLIER_DEN);
}

pub fn compute_send_amount(utxo_value: u64, fee_estimates: &FeeEstimates) -> Result<u64> {
    let fee = compute_fee(fee_estimates)?;
    if utxo_value as f64 <= fee {
        return Err(WalletError::InsufficientFunds {
            value: utxo_value,
            fee,
        });
    }
    let send_amount = (utxo_value as f64 - fee).floor() as u64;
    // less than one satoshi left after rounding down
    if send_amount == 0 {
        return Err(WalletError::InsufficientFunds {
            value: utxo_value,
            fee,
        });
    }
    debug!(
        "utxo value {} minus fee {} leaves {} to send",
        utxo_value, fee, send_amount
    );
    return Ok(send_amount);
}
