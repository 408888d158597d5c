//! Pure PnL and depth calculations used by the store's reports

use crate::config::DEFAULT_LEVERAGE;
use crate::domain::errors::StoreError;

/// Upper bound of the PnL-adjusted depth percentage
pub const MAX_DEPTH_PCT: f64 = 100.0;

/// Mark-to-market PnL of a position.
///
/// `asset_qty` is signed, so no branching on side is needed.
pub fn unrealised_pnl(asset_qty: f64, entry_price: f64, last_price: f64) -> f64 {
    asset_qty * (last_price - entry_price)
}

/// Notional value of a position at entry
pub fn estimated_value(asset_qty: f64, entry_price: f64) -> f64 {
    (asset_qty * entry_price).abs()
}

/// Leverage to divide by: the known leverage if usable, otherwise the fallback.
///
/// Fallbacks below 1 are lifted to 1 so an absent leverage never inflates depth.
pub fn effective_leverage(leverage: Option<f64>, fallback: f64) -> f64 {
    match leverage {
        Some(value) if value.is_finite() && value > 0.0 => value,
        _ if fallback.is_finite() && fallback >= DEFAULT_LEVERAGE => fallback,
        _ => DEFAULT_LEVERAGE,
    }
}

/// Capital actually committed to a position once leverage is applied
pub fn estimated_value_with_leverage(estimated_value: f64, leverage: f64) -> f64 {
    estimated_value / leverage
}

/// Share of the available balance committed, in percent
pub fn depth_pct(value_with_leverage: f64, available_balance: f64) -> Result<f64, StoreError> {
    if available_balance == 0.0 || !available_balance.is_finite() {
        return Err(StoreError::divide_by_zero(format!(
            "depth percentage (available balance {})",
            available_balance
        )));
    }
    Ok(value_with_leverage / available_balance * 100.0)
}

/// Depth against the balance after open PnL, clamped to `MAX_DEPTH_PCT`.
///
/// Open losses that use up the whole balance (adjusted balance at or below
/// zero) are reported as fully committed. Only the raw `available_balance`
/// can fail with `DivideByZero`.
pub fn pnl_adjusted_depth_pct(
    total_value_with_leverage: f64,
    available_balance: f64,
    unrealised_pnl: f64,
) -> Result<f64, StoreError> {
    // Validates the raw balance before it is adjusted
    depth_pct(total_value_with_leverage, available_balance)?;

    if total_value_with_leverage == 0.0 {
        return Ok(0.0);
    }
    let adjusted_balance = available_balance + unrealised_pnl;
    if adjusted_balance <= 0.0 {
        return Ok(MAX_DEPTH_PCT);
    }
    let pct = depth_pct(total_value_with_leverage, adjusted_balance)?;
    Ok(pct.min(MAX_DEPTH_PCT))
}
