//! # Fee Arithmetic

use crate::domain::{ProgramError, BPS_DENOMINATOR};

/// Split `amount` into `(fee, net)` at `fee_rate_bps`.
///
/// The fee is `floor(amount * bps / 10_000)`, computed in `u128` so no
/// amount overflows the intermediate product.
pub fn compute_fee(amount: u64, fee_rate_bps: u16) -> Result<(u64, u64), ProgramError> {
    let fee = u128::from(amount) * u128::from(fee_rate_bps) / u128::from(BPS_DENOMINATOR);
    let fee = u64::try_from(fee).map_err(|_| ProgramError::ArithmeticOverflow)?;
    let net = amount
        .checked_sub(fee)
        .ok_or(ProgramError::ArithmeticOverflow)?;
    Ok((fee, net))
}
