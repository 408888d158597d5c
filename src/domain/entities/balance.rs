//! Balance entity - wallet balance with a snapshot slot for before/after diffs

use serde::{Deserialize, Serialize};

/// Wallet balance of the account in quote currency.
///
/// No sign validation: a negative balance represents a debt or margin-call
/// state and must be representable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub current: f64,
    pub previous: f64,
}

impl WalletBalance {
    /// Copy the current balance into the previous slot
    pub fn snapshot(&mut self) {
        self.previous = self.current;
    }

    /// Change since the last snapshot
    pub fn diff(&self) -> f64 {
        self.current - self.previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_diff() {
        let mut balance = WalletBalance {
            current: 1000.0,
            ..Default::default()
        };
        balance.snapshot();
        balance.current = 1250.0;

        assert_eq!(balance.previous, 1000.0);
        assert_eq!(balance.diff(), 250.0);
    }

    #[test]
    fn test_negative_balance_is_allowed() {
        let balance = WalletBalance {
            current: -42.5,
            previous: 0.0,
        };
        assert_eq!(balance.current, -42.5);
    }
}
