//! Account: cash balance plus at most one open long position.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An open long position with its protective levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Units of the traded asset. Always > 0.
    pub size: f64,
}

impl Position {
    /// Market value at `price`, without any exit fee.
    pub fn market_value(&self, price: f64) -> f64 {
        self.size * price
    }
}

/// Position state of the account. A position either exists in full or not at all.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AccountState {
    #[default]
    Flat,
    Long(Position),
}

/// Cash plus position state, owned by a single engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub cash: f64,
    pub state: AccountState,
}

impl Account {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            cash: initial_cash,
            state: AccountState::Flat,
        }
    }

    pub fn is_long(&self) -> bool {
        matches!(self.state, AccountState::Long(_))
    }

    pub fn position(&self) -> Option<&Position> {
        match &self.state {
            AccountState::Long(pos) => Some(pos),
            AccountState::Flat => None,
        }
    }

    /// Mark-to-market equity: cash plus position value at `price`.
    ///
    /// No exit fee is deducted; fees are only charged when a trade is realized.
    pub fn equity(&self, price: f64) -> f64 {
        match &self.state {
            AccountState::Flat => self.cash,
            AccountState::Long(pos) => self.cash + pos.market_value(price),
        }
    }

    /// Replace the state with `Flat`, returning the position that was open.
    pub fn take_position(&mut self) -> Option<Position> {
        match std::mem::take(&mut self.state) {
            AccountState::Long(pos) => Some(pos),
            AccountState::Flat => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn position() -> Position {
        Position {
            entry_time: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            entry_price: 100.0,
            stop_loss: 90.0,
            take_profit: 115.0,
            size: 2.0,
        }
    }

    #[test]
    fn flat_equity_is_cash() {
        let account = Account::new(1_000.0);
        assert!(!account.is_long());
        assert_eq!(account.equity(123.0), 1_000.0);
    }

    #[test]
    fn long_equity_marks_to_market_without_fee() {
        let account = Account {
            cash: 800.0,
            state: AccountState::Long(position()),
        };
        assert!(account.is_long());
        assert_eq!(account.equity(110.0), 800.0 + 220.0);
    }

    #[test]
    fn take_position_leaves_account_flat() {
        let mut account = Account {
            cash: 800.0,
            state: AccountState::Long(position()),
        };
        let pos = account.take_position().unwrap();
        assert_eq!(pos.size, 2.0);
        assert_eq!(account.state, AccountState::Flat);
        assert!(account.take_position().is_none());
    }
}
