//! Leverage entity - per-symbol leverage, split by side for hedge-mode accounts

use serde::{Deserialize, Serialize};

use super::order::OrderSide;
use super::position::PositionSide;

/// Leverage settings for one symbol
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymbolLeverage {
    /// Leverage applied to buy orders / long positions
    pub buy: f64,
    /// Leverage applied to sell orders / short positions
    pub sell: f64,
}

impl SymbolLeverage {
    /// Same leverage on both sides, as reported by one-way mode accounts
    pub fn symmetric(leverage: f64) -> Self {
        Self {
            buy: leverage,
            sell: leverage,
        }
    }

    pub fn for_order_side(&self, side: OrderSide) -> f64 {
        match side {
            OrderSide::Buy => self.buy,
            OrderSide::Sell => self.sell,
        }
    }

    pub fn for_position_side(&self, side: PositionSide) -> f64 {
        match side {
            PositionSide::Long => self.buy,
            PositionSide::Short => self.sell,
        }
    }

    /// Overwrite one side only
    pub fn set_order_side(&mut self, side: OrderSide, leverage: f64) {
        match side {
            OrderSide::Buy => self.buy = leverage,
            OrderSide::Sell => self.sell = leverage,
        }
    }

    /// Single figure for reporting: the higher of the two sides
    pub fn headline(&self) -> f64 {
        self.buy.max(self.sell)
    }
}
