//! Domain types for Crossbot

pub mod account;
pub mod bar;
pub mod trade;

pub use account::{Account, AccountState, Position};
pub use bar::{Bar, EnrichedBar};
pub use trade::{EquityPoint, ExitReason, TradeEvent, TradeRecord, TradeSide};
