//! Read-only reports derived from the account state

use serde::{Deserialize, Serialize};

use crate::domain::entities::position::{Position, PositionSide};
use crate::domain::errors::StoreError;
use crate::domain::services::math;
use crate::domain::value_objects::pnl::PnlBreakdown;

/// Active position annotated with the leverage currently known for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionWithLeverage {
    #[serde(flatten)]
    pub position: Position,
    pub leverage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub starting_balance: f64,
    pub balance: f64,
    pub positions: Vec<PositionWithLeverage>,
    pub total_unrealised_pnl: f64,
    pub total_margin_value: f64,
    pub pnl: PnlBreakdown,
    /// Realised plus unrealised PnL
    pub total_pnl: f64,
    /// Starting balance plus open PnL, as if every position closed at market
    pub balance_if_closed_at_market: f64,
    /// Wallet balance plus margin locked in open positions
    pub balance_with_margin: f64,
}

impl SessionSummary {
    pub fn build(starting_balance: f64, balance: f64, positions: Vec<PositionWithLeverage>) -> Self {
        let total_unrealised_pnl: f64 = positions.iter().map(|p| p.position.value_upnl).sum();
        let total_margin_value: f64 = positions.iter().map(|p| p.position.margin_value).sum();
        let pnl = PnlBreakdown::new(balance - starting_balance, total_unrealised_pnl);

        Self {
            starting_balance,
            balance,
            positions,
            total_unrealised_pnl,
            total_margin_value,
            total_pnl: pnl.total(),
            pnl,
            balance_if_closed_at_market: starting_balance + total_unrealised_pnl,
            balance_with_margin: balance + total_margin_value,
        }
    }
}

/// Exposure of one position relative to the available balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDepth {
    pub symbol: String,
    pub side: PositionSide,
    pub leverage: f64,
    pub estimated_value: f64,
    pub estimated_value_with_leverage: f64,
    pub depth_pct: f64,
    pub value_upnl: f64,
}

impl PositionDepth {
    pub fn build(
        position: &Position,
        leverage: Option<f64>,
        fallback_leverage: f64,
        available_balance: f64,
    ) -> Result<Self, StoreError> {
        let leverage = math::effective_leverage(leverage, fallback_leverage);
        let estimated_value = math::estimated_value(position.asset_qty, position.entry_price);
        let estimated_value_with_leverage =
            math::estimated_value_with_leverage(estimated_value, leverage);
        let depth_pct = math::depth_pct(estimated_value_with_leverage, available_balance)?;

        Ok(Self {
            symbol: position.symbol.clone(),
            side: position.side,
            leverage,
            estimated_value,
            estimated_value_with_leverage,
            depth_pct,
            value_upnl: position.value_upnl,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthSummary {
    pub available_balance: f64,
    pub positions: Vec<PositionDepth>,
    pub total_estimated_value: f64,
    pub total_estimated_value_with_leverage: f64,
    pub total_depth_pct: f64,
    pub total_unrealised_pnl: f64,
    /// Depth against the balance after open PnL, never above 100
    pub pnl_adjusted_depth_pct: f64,
}

impl DepthSummary {
    pub fn build(available_balance: f64, positions: Vec<PositionDepth>) -> Result<Self, StoreError> {
        let total_estimated_value: f64 = positions.iter().map(|p| p.estimated_value).sum();
        let total_estimated_value_with_leverage: f64 =
            positions.iter().map(|p| p.estimated_value_with_leverage).sum();
        let total_unrealised_pnl: f64 = positions.iter().map(|p| p.value_upnl).sum();

        let total_depth_pct = math::depth_pct(total_estimated_value_with_leverage, available_balance)?;
        let pnl_adjusted_depth_pct = math::pnl_adjusted_depth_pct(
            total_estimated_value_with_leverage,
            available_balance,
            total_unrealised_pnl,
        )?;

        Ok(Self {
            available_balance,
            positions,
            total_estimated_value,
            total_estimated_value_with_leverage,
            total_depth_pct,
            total_unrealised_pnl,
            pnl_adjusted_depth_pct,
        })
    }
}
