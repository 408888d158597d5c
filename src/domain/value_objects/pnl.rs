use serde::{Deserialize, Serialize};

/// Profit and loss of a trading session, split into closed and open parts.
///
/// Both parts can be negative to represent losses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PnlBreakdown {
    /// Wallet balance change since the session started
    pub realised_pnl: f64,
    /// Mark-to-market PnL of positions still open
    pub unrealised_pnl: f64,
}

impl PnlBreakdown {
    pub fn new(realised_pnl: f64, unrealised_pnl: f64) -> Self {
        Self {
            realised_pnl,
            unrealised_pnl,
        }
    }

    pub fn total(&self) -> f64 {
        self.realised_pnl + self.unrealised_pnl
    }
}

impl std::fmt::Display for PnlBreakdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "realised {} / unrealised {}",
            signed_dollars(self.realised_pnl),
            signed_dollars(self.unrealised_pnl)
        )
    }
}

fn signed_dollars(value: f64) -> String {
    if value >= 0.0 {
        format!("+${:.2}", value)
    } else {
        format!("-${:.2}", value.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pnl_total() {
        let pnl = PnlBreakdown::new(200.0, -50.0);
        assert_eq!(pnl.total(), 150.0);
    }

    #[test]
    fn test_pnl_zero() {
        let pnl = PnlBreakdown::default();
        assert_eq!(pnl.total(), 0.0);
    }

    #[test]
    fn test_pnl_display() {
        let pnl = PnlBreakdown::new(1234.56, -789.12);
        assert_eq!(format!("{}", pnl), "realised +$1234.56 / unrealised -$789.12");
    }
}
