//! Fee arithmetic for unshields routed through the relay adapter.
//!
//! The protocol charges its unshield fee on the way out, so the relay
//! adapter only ever receives `value - fee` of the wrapped token. Both
//! adapter calls (unwrap and native transfer) must use that reduced amount.

/// Denominator of every basis-point fee.
pub const BASIS_POINTS: u128 = 10_000;
/// Protocol unshield fee.
pub const UNSHIELD_FEE_BASIS_POINTS: u128 = 25;

/// fee = value * fee_bps / 10000 (integer division, rounds down)
///
/// `fee_basis_points` is capped at 10000, so the fee never exceeds `value`.
pub fn unshield_fee(value: u128, fee_basis_points: u128) -> u128 {
    let fee_basis_points = fee_basis_points.min(BASIS_POINTS);
    // value * bps can overflow for large values; split to stay exact.
    (value / BASIS_POINTS) * fee_basis_points
        + (value % BASIS_POINTS) * fee_basis_points / BASIS_POINTS
}

/// Amount left after the unshield fee.
pub fn value_after_unshield_fee(value: u128, fee_basis_points: u128) -> u128 {
    value - unshield_fee(value, fee_basis_points)
}
