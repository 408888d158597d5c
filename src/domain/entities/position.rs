use serde::{Deserialize, Serialize};

use crate::domain::services::math;

/// Directional exposure a stored position represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Long,
    Short,
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionSide::Long => write!(f, "LONG"),
            PositionSide::Short => write!(f, "SHORT"),
        }
    }
}

/// How the position is referenced when placing a closing order.
///
/// `Both` is used by accounts trading in one-way (non-hedge) mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionOrderSide {
    Long,
    Short,
    Both,
}

impl std::fmt::Display for PositionOrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionOrderSide::Long => write!(f, "LONG"),
            PositionOrderSide::Short => write!(f, "SHORT"),
            PositionOrderSide::Both => write!(f, "BOTH"),
        }
    }
}

/// Open position as reported by the exchange, normalized by an adapter.
///
/// `asset_qty` is signed: positive for long exposure, negative for short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    /// Milliseconds since the unix epoch
    pub timestamp: i64,
    pub side: PositionSide,
    pub order_side: PositionOrderSide,
    pub entry_price: f64,
    pub asset_qty: f64,
    /// Notional value in quote currency
    pub value: f64,
    /// Unrealized PnL in quote currency
    pub value_upnl: f64,
    pub margin_value: f64,
    pub liquidation_price: f64,
    pub stop_loss_price: Option<f64>,
    pub take_profit_price: Option<f64>,
}

impl Position {
    /// Build a position with derived notional value and zero PnL.
    ///
    /// Margin, liquidation price and stops are left for the caller to fill in.
    pub fn new(
        symbol: impl Into<String>,
        side: PositionSide,
        order_side: PositionOrderSide,
        asset_qty: f64,
        entry_price: f64,
        timestamp: i64,
    ) -> Self {
        Position {
            symbol: symbol.into(),
            timestamp,
            side,
            order_side,
            entry_price,
            asset_qty,
            value: (asset_qty * entry_price).abs(),
            value_upnl: 0.0,
            margin_value: 0.0,
            liquidation_price: 0.0,
            stop_loss_price: None,
            take_profit_price: None,
        }
    }

    pub fn with_margin_value(mut self, margin_value: f64) -> Self {
        self.margin_value = margin_value;
        self
    }

    pub fn with_liquidation_price(mut self, liquidation_price: f64) -> Self {
        self.liquidation_price = liquidation_price;
        self
    }

    pub fn with_stops(mut self, stop_loss_price: Option<f64>, take_profit_price: Option<f64>) -> Self {
        self.stop_loss_price = stop_loss_price;
        self.take_profit_price = take_profit_price;
        self
    }

    /// A position only exists while it holds a non-zero quantity
    pub fn is_active(&self) -> bool {
        self.asset_qty != 0.0
    }

    /// Recompute unrealized PnL against the latest observed price.
    ///
    /// The signed quantity keeps the formula correct for both sides.
    pub fn mark_to_market(&mut self, last_price: f64) {
        self.value_upnl = math::unrealised_pnl(self.asset_qty, self.entry_price, last_price);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_new() {
        let position = Position::new(
            "BTCUSDT",
            PositionSide::Long,
            PositionOrderSide::Long,
            0.5,
            50000.0,
            1_700_000_000_000,
        );

        assert_eq!(position.symbol, "BTCUSDT");
        assert_eq!(position.side, PositionSide::Long);
        assert_eq!(position.value, 25000.0);
        assert_eq!(position.value_upnl, 0.0);
        assert!(position.stop_loss_price.is_none());
        assert!(position.is_active());
    }

    #[test]
    fn test_position_short_value_is_absolute() {
        let position = Position::new(
            "ETHUSDT",
            PositionSide::Short,
            PositionOrderSide::Short,
            -2.0,
            3000.0,
            0,
        );
        assert_eq!(position.value, 6000.0);
    }

    #[test]
    fn test_zero_quantity_is_not_active() {
        let position = Position::new("BTCUSDT", PositionSide::Long, PositionOrderSide::Both, 0.0, 100.0, 0);
        assert!(!position.is_active());
    }

    #[test]
    fn test_mark_to_market_long_and_short() {
        let mut long = Position::new("X", PositionSide::Long, PositionOrderSide::Long, 2.0, 100.0, 0);
        let mut short = Position::new("X", PositionSide::Short, PositionOrderSide::Short, -2.0, 100.0, 0);

        long.mark_to_market(110.0);
        short.mark_to_market(110.0);

        assert_eq!(long.value_upnl, 20.0);
        assert_eq!(short.value_upnl, -20.0);
    }

    #[test]
    fn test_mark_to_market_matches_pnl_formula() {
        let mut position = Position::new("X", PositionSide::Short, PositionOrderSide::Short, -0.3, 2500.0, 0);
        position.mark_to_market(2450.0);

        assert_eq!(position.value_upnl, math::unrealised_pnl(-0.3, 2500.0, 2450.0));
    }

    #[test]
    fn test_builders() {
        let position = Position::new("X", PositionSide::Long, PositionOrderSide::Long, 1.0, 100.0, 0)
            .with_margin_value(10.0)
            .with_liquidation_price(91.0)
            .with_stops(Some(95.0), Some(120.0));

        assert_eq!(position.margin_value, 10.0);
        assert_eq!(position.liquidation_price, 91.0);
        assert_eq!(position.stop_loss_price, Some(95.0));
        assert_eq!(position.take_profit_price, Some(120.0));
    }

    #[test]
    fn test_side_display_and_serde() {
        assert_eq!(PositionSide::Long.to_string(), "LONG");
        assert_eq!(PositionOrderSide::Both.to_string(), "BOTH");
        assert_eq!(serde_json::to_string(&PositionSide::Short).unwrap(), "\"SHORT\"");
    }
}
